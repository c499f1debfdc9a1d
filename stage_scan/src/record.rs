use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use utilities::statistics::SampleStats;

/// Column header of the scan record.
///
/// The power columns are labelled W but hold the meter's mW readings.
/// Downstream analysis scripts match this line verbatim.
pub const HEADER: &str = "Step\tPosition (mm)\tPower (W)\tError (W)";

pub fn format_record(step: u32, position_mm: f64, mean_mw: f64, std_mw: f64) -> String {
    format!("{step}\t{position_mm:.2}\t{mean_mw:.5}\t{std_mw:.5}")
}

/// Tab separated scan log, one line per step. Every line is flushed as soon as
/// it is written.
pub struct RecordWriter<W: Write> {
    inner: W,
}

impl RecordWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(mut inner: W) -> io::Result<Self> {
        writeln!(inner, "{HEADER}")?;
        inner.flush()?;
        Ok(Self { inner })
    }

    pub fn append(&mut self, step: u32, position_mm: f64, power: &SampleStats) -> io::Result<()> {
        writeln!(
            self.inner,
            "{}",
            format_record(step, position_mm, power.mean, power.std_dev)
        )?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_line_format() {
        assert_eq!(
            format_record(3, 1.23, 0.50512, 0.00321),
            "3\t1.23\t0.50512\t0.00321"
        );
        assert_eq!(format_record(1, 0.0, 12.0, 0.0), "1\t0.00\t12.00000\t0.00000");
    }

    #[test]
    fn writer_emits_header_then_one_line_per_step() {
        let mut buffer = Vec::new();
        let mut writer = RecordWriter::new(&mut buffer).unwrap();
        let stats = SampleStats::from_samples(&[10.0, 10.2, 9.8, 10.0]).unwrap();
        writer.append(1, 0.5, &stats).unwrap();
        writer.append(2, 1.0, &stats).unwrap();
        drop(writer);

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.ends_with('\n'));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "1\t0.50\t10.00000\t0.14142");
        assert_eq!(lines[2], "2\t1.00\t10.00000\t0.14142");
    }

    #[test]
    fn header_keeps_watt_labels() {
        assert!(HEADER.contains("Power (W)"));
        assert!(HEADER.contains("Error (W)"));
    }
}
