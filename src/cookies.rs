//! Cookie persistence
//!
//! One cookie per line, six `;`-separated fields in a fixed order:
//!
//! ```text
//! name;value;domain;path;expiry;secure
//! ```
//!
//! `expiry` is a Unix timestamp in seconds, or the literal `null` for a
//! session cookie. `secure` is `true` or `false`.

use crate::{browser::driver::Driver, error::{PomError, Result}};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::{BufRead, BufReader, BufWriter, Write}, path::Path};

const FIELD_COUNT: usize = 6;
const SEPARATOR: char = ';';
const NO_EXPIRY: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Expiry as Unix seconds; `None` for session cookies
    pub expiry: Option<i64>,
    pub secure: bool,
}

impl CookieRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            expiry: None,
            secure: false,
        }
    }

    /// Builder method: set domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Builder method: set path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Builder method: set expiry
    pub fn with_expiry(mut self, expiry: i64) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Builder method: set the secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Encode as one persisted line (without the newline)
    ///
    /// Fails when a field contains the separator or a line break, since the
    /// record could not be read back intact.
    pub fn to_line(&self) -> std::result::Result<String, String> {
        for (field, value) in [("name", &self.name), ("value", &self.value), ("domain", &self.domain), ("path", &self.path)] {
            if value.contains(SEPARATOR) || value.contains('\n') || value.contains('\r') {
                return Err(format!("{} of cookie '{}' contains a reserved character", field, self.name));
            }
        }

        let expiry = self.expiry.map_or_else(|| NO_EXPIRY.to_string(), |e| e.to_string());
        Ok(format!(
            "{name}{sep}{value}{sep}{domain}{sep}{path}{sep}{expiry}{sep}{secure}",
            name = self.name,
            value = self.value,
            domain = self.domain,
            path = self.path,
            expiry = expiry,
            secure = self.secure,
            sep = SEPARATOR,
        ))
    }

    /// Decode one persisted line
    pub fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(format!("expected {} fields, found {}", FIELD_COUNT, fields.len()));
        }

        let expiry = match fields[4] {
            NO_EXPIRY => None,
            raw => Some(raw.parse::<i64>().map_err(|e| format!("invalid expiry '{}': {}", raw, e))?),
        };
        let secure = match fields[5] {
            "true" => true,
            "false" => false,
            other => return Err(format!("invalid secure flag '{}'", other)),
        };

        Ok(Self {
            name: fields[0].to_string(),
            value: fields[1].to_string(),
            domain: fields[2].to_string(),
            path: fields[3].to_string(),
            expiry,
            secure,
        })
    }
}

/// Outcome of a save
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SaveReport {
    pub saved: usize,
    /// Names of cookies that could not be encoded
    pub skipped: Vec<String>,
}

/// Outcome of a load: how many cookies were restored and which lines failed
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub errors: Vec<PomError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Saves and restores a session's cookies in the flat line format
#[derive(Debug, Default, Clone, Copy)]
pub struct CookieStore;

impl CookieStore {
    pub fn new() -> Self {
        Self
    }

    /// Write every cookie of the session to `destination`
    pub fn save<D: Driver + ?Sized>(&self, driver: &D, destination: impl AsRef<Path>) -> Result<SaveReport> {
        let destination = destination.as_ref();
        log::info!("Saving cookies to file: {}", destination.display());

        let cookies = driver.cookies()?;
        let mut writer = BufWriter::new(File::create(destination)?);
        let report = self.write_to(&cookies, &mut writer)?;
        writer.flush()?;

        log::info!("Saved {} cookies to {}", report.saved, destination.display());
        Ok(report)
    }

    /// Read `source` and add each valid record to the session
    ///
    /// A malformed line, or a cookie the session refuses, is recorded in the
    /// report and skipped; the rest of the file is still restored.
    pub fn load<D: Driver + ?Sized>(&self, driver: &D, source: impl AsRef<Path>) -> Result<LoadReport> {
        let source = source.as_ref();
        log::info!("Loading cookies from file: {}", source.display());

        let reader = BufReader::new(File::open(source)?);
        let (cookies, errors) = self.read_from(reader)?;

        let mut report = LoadReport { loaded: 0, errors };
        for cookie in cookies {
            match driver.add_cookie(&cookie) {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    log::warn!("Failed to restore cookie '{}': {}", cookie.name, e);
                    report.errors.push(e);
                }
            }
        }

        log::info!("Loaded {} cookies from {} ({} failed)", report.loaded, source.display(), report.errors.len());
        Ok(report)
    }

    /// Encode cookies into any writer
    pub fn write_to<W: Write>(&self, cookies: &[CookieRecord], writer: &mut W) -> Result<SaveReport> {
        let mut report = SaveReport::default();
        for cookie in cookies {
            match cookie.to_line() {
                Ok(line) => {
                    writeln!(writer, "{}", line)?;
                    report.saved += 1;
                }
                Err(reason) => {
                    log::warn!("Skipping cookie: {}", reason);
                    report.skipped.push(cookie.name.clone());
                }
            }
        }
        Ok(report)
    }

    /// Decode records from any reader; blank lines are ignored
    pub fn read_from<R: BufRead>(&self, reader: R) -> Result<(Vec<CookieRecord>, Vec<PomError>)> {
        let mut cookies = Vec::new();
        let mut errors = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            match CookieRecord::parse_line(line) {
                Ok(cookie) => cookies.push(cookie),
                Err(reason) => {
                    let err = PomError::CookieFormat { line: index + 1, reason };
                    log::warn!("{}", err);
                    errors.push(err);
                }
            }
        }

        Ok((cookies, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_format() {
        let cookie = CookieRecord::new("session", "abc123")
            .with_domain(".example.com")
            .with_path("/app")
            .with_expiry(1_700_000_000)
            .with_secure(true);

        assert_eq!(cookie.to_line().unwrap(), "session;abc123;.example.com;/app;1700000000;true");
    }

    #[test]
    fn test_null_expiry() {
        let cookie = CookieRecord::parse_line("theme;dark;example.com;/;null;false").unwrap();
        assert_eq!(cookie.expiry, None);
        assert!(!cookie.secure);
        assert_eq!(cookie.to_line().unwrap(), "theme;dark;example.com;/;null;false");
    }

    #[test]
    fn test_empty_value_survives() {
        let cookie = CookieRecord::new("flag", "").with_domain("example.com");
        let parsed = CookieRecord::parse_line(&cookie.to_line().unwrap()).unwrap();
        assert_eq!(parsed, cookie);
    }

    #[test]
    fn test_wrong_field_count() {
        let err = CookieRecord::parse_line("a;b;c").unwrap_err();
        assert!(err.contains("expected 6 fields, found 3"));
    }

    #[test]
    fn test_bad_secure_flag() {
        assert!(CookieRecord::parse_line("a;b;c;/;null;yes").is_err());
    }

    #[test]
    fn test_reserved_character_rejected() {
        let cookie = CookieRecord::new("bad", "x;y");
        assert!(cookie.to_line().is_err());

        let mut out = Vec::new();
        let report = CookieStore::new().write_to(&[cookie, CookieRecord::new("ok", "1")], &mut out).unwrap();
        assert_eq!(report.saved, 1);
        assert_eq!(report.skipped, vec!["bad".to_string()]);
    }

    #[test]
    fn test_read_continues_past_bad_lines() {
        let input = "a;1;example.com;/;null;false\nbroken line\n\nb;2;example.com;/;42;true\n";
        let (cookies, errors) = CookieStore::new().read_from(Cursor::new(input)).unwrap();

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[1].expiry, Some(42));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], PomError::CookieFormat { line: 2, .. }));
    }
}
