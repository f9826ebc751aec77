use crate::domain::appointment::Appointment;
use crate::error::Result;
use std::io::Write;

/// Writes the final appointment states of a replay as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(dest: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(dest),
        }
    }

    /// Writes one row per appointment, ordered by id.
    pub fn write_report(&mut self, mut appointments: Vec<Appointment>) -> Result<()> {
        appointments.sort_by_key(|appointment| appointment.id);
        self.writer.write_record([
            "id",
            "status",
            "payment_status",
            "cancellation_fee",
            "started_at",
        ])?;
        for appointment in appointments {
            self.writer.write_record([
                appointment.id.to_string(),
                appointment.status.to_string(),
                appointment.payment_status.to_string(),
                appointment
                    .cancellation_fee
                    .map(|fee| fee.to_string())
                    .unwrap_or_default(),
                appointment
                    .started_at
                    .map(|at| at.format("%Y-%m-%dT%H:%M:%S").to_string())
                    .unwrap_or_default(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
