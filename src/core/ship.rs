//! Ship descriptor reader.
//!
//! A `.ship` file is an XML document with one `HullType` element and any number of
//! `HullSocket` elements, each carrying a `Key` (the socket's anchor name in the hull
//! scene) and a `ComponentName`. Elements are matched wherever they appear in the
//! document, and sockets keep document order.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::Path;
use thiserror::Error;

/// Errors produced while reading a ship file
#[derive(Debug, Error)]
pub enum ShipError {
    /// The staged file could not be read
    #[error("could not read ship file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML
    #[error("ship file is not valid XML: {0}")]
    Xml(String),

    /// A required element is missing or empty
    #[error("ship file is malformed: {reason}")]
    Malformed {
        /// Which element was missing
        reason: String,
    },
}

impl ShipError {
    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Whether the error describes the document rather than the filesystem
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Xml(_) | Self::Malformed { .. })
    }
}

/// A component slot on the hull
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socket {
    /// Name of the anchor object in the hull scene
    pub key: String,
    /// Component mounted in the socket
    pub component: String,
}

impl Socket {
    /// Convenience constructor
    pub fn new(key: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            component: component.into(),
        }
    }
}

/// Hull type plus its sockets, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipDescriptor {
    /// Hull type label, used to find the hull scene
    pub hull_type: String,
    /// Sockets in the order they appear in the file
    pub sockets: Vec<Socket>,
}

/// What an uploaded file claims to be, judged from its name alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Anything not matching a disallowed extension; handed to the parser
    Ship,
    /// A `.fleet` file
    Fleet,
    /// A `.missile` file
    Missile,
}

impl UploadKind {
    /// Classifies an upload by file extension (case-insensitive).
    #[must_use]
    pub fn classify(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".fleet") {
            Self::Fleet
        } else if lower.ends_with(".missile") {
            Self::Missile
        } else {
            Self::Ship
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    HullType,
    Key,
    Component,
}

impl Field {
    const fn tag(self) -> &'static [u8] {
        match self {
            Self::HullType => b"HullType",
            Self::Key => b"Key",
            Self::Component => b"ComponentName",
        }
    }
}

#[derive(Default)]
struct PartialSocket {
    key: Option<String>,
    component: Option<String>,
}

/// Parses ship file contents.
///
/// # Errors
/// `ShipError::Xml` for broken XML, `ShipError::Malformed` when the hull type is
/// missing or a socket lacks its key or component name.
pub fn parse_ship(xml: &str) -> Result<ShipDescriptor, ShipError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut hull_type: Option<String> = None;
    let mut sockets = Vec::new();
    let mut socket: Option<PartialSocket> = None;
    let mut capture: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name == b"HullSocket" {
                    socket = Some(PartialSocket::default());
                } else if capture.is_none() {
                    capture = match (name, socket.as_ref()) {
                        (b"HullType", _) if hull_type.is_none() => Some(Field::HullType),
                        (b"Key", Some(s)) if s.key.is_none() => Some(Field::Key),
                        (b"ComponentName", Some(s)) if s.component.is_none() => {
                            Some(Field::Component)
                        }
                        _ => None,
                    };
                    text.clear();
                }
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"HullSocket" => {
                return Err(ShipError::malformed(format!(
                    "HullSocket #{} has no Key or ComponentName",
                    sockets.len() + 1
                )));
            }
            Ok(Event::Text(ref t)) if capture.is_some() => {
                let unescaped = t.unescape().map_err(|e| ShipError::Xml(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(ref c)) if capture.is_some() => {
                text.push_str(&String::from_utf8_lossy(c));
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(field) = capture.filter(|f| f.tag() == name) {
                    let value = text.trim().to_string();
                    let value = (!value.is_empty()).then_some(value);
                    match (field, socket.as_mut()) {
                        (Field::HullType, _) => hull_type = value,
                        (Field::Key, Some(s)) => s.key = value,
                        (Field::Component, Some(s)) => s.component = value,
                        _ => {}
                    }
                    capture = None;
                } else if name == b"HullSocket" {
                    let index = sockets.len() + 1;
                    let finished = socket.take().unwrap_or_default();
                    let key = finished.key.ok_or_else(|| {
                        ShipError::malformed(format!("HullSocket #{index} has no Key"))
                    })?;
                    let component = finished.component.ok_or_else(|| {
                        ShipError::malformed(format!("HullSocket #{index} has no ComponentName"))
                    })?;
                    sockets.push(Socket { key, component });
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ShipError::Xml(e.to_string())),
        }
    }

    let hull_type = hull_type.ok_or_else(|| ShipError::malformed("no HullType element"))?;
    Ok(ShipDescriptor { hull_type, sockets })
}

/// Reads and parses a staged ship file.
///
/// # Errors
/// `ShipError::Io` if the file cannot be read, otherwise as [`parse_ship`].
pub async fn read_ship_file(path: &Path) -> Result<ShipDescriptor, ShipError> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_ship(&contents)
}
