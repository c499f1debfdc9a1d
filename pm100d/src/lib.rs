use std::{
    fmt,
    io::{Error, ErrorKind, Read, Result, Write},
    time::Duration,
};

/// Thorlabs (0x1313) PM100D (0x8078) on any USB VISA interface.
pub const RESOURCE_PATTERN: &str = "USB?*::0x1313::0x8078::?*::INSTR";
/// Time allowed for opening the session. Reads and writes use the VISA
/// default I/O timeout of 2 s.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(2);

const TERMINATOR: u8 = b'\n';
const MAX_LINE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerUnit {
    Watt,
    #[default]
    MilliWatt,
}

impl fmt::Display for PowerUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerUnit::Watt => write!(f, "W"),
            PowerUnit::MilliWatt => write!(f, "mW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSettings {
    pub unit: PowerUnit,
    pub auto_range: bool,
    pub average_count: u32,
    pub wavelength_nm: f64,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            unit: PowerUnit::MilliWatt,
            auto_range: true,
            average_count: 50,
            wavelength_nm: 1064.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Pm100d;

impl Pm100d {
    pub fn new() -> Self {
        Pm100d
    }

    pub fn identify(&self, sender: &mut (impl Write + Read)) -> Result<String> {
        self.query(sender, "*idn?")
    }

    pub fn beep(&self, sender: &mut (impl Write + Read)) -> Result<()> {
        self.write(sender, "system:beeper")
    }

    pub fn set_power_unit(&self, sender: &mut (impl Write + Read), unit: PowerUnit) -> Result<()> {
        self.write(sender, &format!("sense:power:unit {unit}"))
    }

    pub fn set_auto_range(&self, sender: &mut (impl Write + Read), enabled: bool) -> Result<()> {
        self.write(
            sender,
            &format!("sense:power:range:auto {}", if enabled { 1 } else { 0 }),
        )
    }

    pub fn set_average_count(&self, sender: &mut (impl Write + Read), count: u32) -> Result<()> {
        if count == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Average count must be at least 1",
            ));
        }
        self.write(sender, &format!("sense:average:count {count}"))
    }

    pub fn configure_power(&self, sender: &mut (impl Write + Read)) -> Result<()> {
        self.write(sender, "configure:power")
    }

    pub fn set_wavelength(&self, sender: &mut (impl Write + Read), wavelength_nm: f64) -> Result<()> {
        if !wavelength_nm.is_finite() || wavelength_nm <= 0.0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Invalid correction wavelength: {wavelength_nm}"),
            ));
        }
        self.write(
            sender,
            &format!("sense:correction:wavelength {wavelength_nm:.1}"),
        )
    }

    pub fn configure(&self, sender: &mut (impl Write + Read), settings: &MeterSettings) -> Result<()> {
        self.set_power_unit(sender, settings.unit)?;
        self.set_auto_range(sender, settings.auto_range)?;
        self.set_average_count(sender, settings.average_count)?;
        self.configure_power(sender)?;
        self.set_wavelength(sender, settings.wavelength_nm)
    }

    /// Single `read?` in the configured unit.
    pub fn read_power(&self, sender: &mut (impl Write + Read)) -> Result<f64> {
        let response = self.query(sender, "read?")?;
        parse_reading(&response)
    }

    pub fn read_batch(&self, sender: &mut (impl Write + Read), count: usize) -> Result<Vec<f64>> {
        (0..count).map(|_| self.read_power(sender)).collect()
    }

    fn write(&self, sender: &mut (impl Write + Read), command: &str) -> Result<()> {
        let mut frame = Vec::with_capacity(command.len() + 1);
        frame.extend_from_slice(command.as_bytes());
        frame.push(TERMINATOR);

        sender.write_all(&frame)?;
        sender.flush()
    }

    fn query(&self, sender: &mut (impl Write + Read), command: &str) -> Result<String> {
        self.write(sender, command)?;
        read_line(sender)
    }
}

/// Reads up to the terminator one byte at a time so nothing past the reply is
/// consumed from the session.
fn read_line(sender: &mut impl Read) -> Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match sender.read(&mut byte)? {
            0 if line.is_empty() => {
                return Err(Error::new(ErrorKind::UnexpectedEof, "Empty response"));
            }
            0 => break,
            _ if byte[0] == TERMINATOR => break,
            _ => line.push(byte[0]),
        }

        if line.len() > MAX_LINE {
            return Err(Error::new(ErrorKind::InvalidData, "Response too long"));
        }
    }

    String::from_utf8(line)
        .map(|s| s.trim_end_matches('\r').to_string())
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

/// First value of an ASCII reply, e.g. `1.234E-01`.
pub fn parse_reading(response: &str) -> Result<f64> {
    let value = response
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Empty power reading"))?;

    value.parse::<f64>().map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Failed to parse power reading '{value}': {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Records writes, answers every query with the next scripted line.
    #[derive(Default)]
    struct ScriptedMeter {
        written: Vec<u8>,
        replies: VecDeque<u8>,
    }

    impl ScriptedMeter {
        fn with_replies(replies: &[&str]) -> Self {
            let mut meter = Self::default();
            for reply in replies {
                meter.replies.extend(reply.as_bytes());
                meter.replies.push_back(b'\n');
            }
            meter
        }

        fn commands(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.written)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for ScriptedMeter {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    impl Read for ScriptedMeter {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let mut n = 0;
            while n < buf.len() {
                match self.replies.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    #[test]
    fn configure_sends_commands_in_order() {
        let mut meter = ScriptedMeter::default();
        Pm100d::new()
            .configure(&mut meter, &MeterSettings::default())
            .unwrap();

        assert_eq!(
            meter.commands(),
            vec![
                "sense:power:unit mW",
                "sense:power:range:auto 1",
                "sense:average:count 50",
                "configure:power",
                "sense:correction:wavelength 1064.0",
            ]
        );
    }

    #[test]
    fn read_batch_queries_once_per_sample() {
        let mut meter = ScriptedMeter::with_replies(&["10.0", "1.02E+01", "9.8", "10.0"]);
        let readings = Pm100d::new().read_batch(&mut meter, 4).unwrap();

        assert_eq!(readings, vec![10.0, 10.2, 9.8, 10.0]);
        assert_eq!(meter.commands(), vec!["read?"; 4]);
    }

    #[test]
    fn identify_strips_carriage_return() {
        let mut meter = ScriptedMeter::with_replies(&["Thorlabs,PM100D,P0012345,2.6.0\r"]);
        let idn = Pm100d::new().identify(&mut meter).unwrap();
        assert_eq!(idn, "Thorlabs,PM100D,P0012345,2.6.0");
    }

    #[test]
    fn malformed_reading_is_invalid_data() {
        let mut meter = ScriptedMeter::with_replies(&["NaN?"]);
        let err = Pm100d::new().read_power(&mut meter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn missing_reply_is_eof() {
        let mut meter = ScriptedMeter::default();
        let err = Pm100d::new().read_power(&mut meter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn rejects_invalid_settings_before_writing() {
        let mut meter = ScriptedMeter::default();
        let pm = Pm100d::new();
        assert!(pm.set_wavelength(&mut meter, -5.0).is_err());
        assert!(pm.set_average_count(&mut meter, 0).is_err());
        assert!(meter.written.is_empty());
    }

    #[test]
    fn parses_first_field_of_reply() {
        assert_eq!(parse_reading(" 5.0512E-01 ").unwrap(), 0.50512);
        assert_eq!(parse_reading("1.5,0").unwrap(), 1.5);
        assert!(parse_reading("").is_err());
    }
}
