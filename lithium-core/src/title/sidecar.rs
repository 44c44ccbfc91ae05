use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

use super::record::TitleMetadata;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed sidecar: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Sidecar has no title")]
    MissingTitle,
}

/// Fields declared by a `_resources/default.xml` sidecar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecar {
    pub title: String,
    pub metadata: TitleMetadata,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Developer,
    Publisher,
    ReleaseDate,
    Rating,
    Overview,
}

impl Field {
    fn from_element(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"developer" => Some(Field::Developer),
            b"publisher" => Some(Field::Publisher),
            b"release_date" => Some(Field::ReleaseDate),
            b"rating" => Some(Field::Rating),
            b"overview" => Some(Field::Overview),
            _ => None,
        }
    }
}

/// Read and parse a sidecar file
pub fn read_sidecar(path: &Path) -> Result<Sidecar, SidecarError> {
    let text = std::fs::read_to_string(path)?;
    parse_sidecar(&text)
}

/// Parse sidecar XML; the known elements may appear at any depth and the
/// first non-empty occurrence of each wins
pub fn parse_sidecar(xml: &str) -> Result<Sidecar, SidecarError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut title: Option<String> = None;
    let mut metadata = TitleMetadata::default();
    let mut current: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                current = Field::from_element(element.local_name().as_ref());
            }
            Event::End(_) => current = None,
            Event::Text(text) => {
                if let Some(field) = current {
                    let value = text.unescape()?;
                    store(field, value.trim(), &mut title, &mut metadata);
                }
            }
            Event::CData(data) => {
                if let Some(field) = current {
                    let bytes = data.into_inner();
                    let value = String::from_utf8_lossy(&bytes);
                    store(field, value.trim(), &mut title, &mut metadata);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let title = title.ok_or(SidecarError::MissingTitle)?;
    Ok(Sidecar { title, metadata })
}

fn store(field: Field, value: &str, title: &mut Option<String>, metadata: &mut TitleMetadata) {
    if value.is_empty() {
        return;
    }

    let slot = match field {
        Field::Title => title,
        Field::Developer => &mut metadata.developer,
        Field::Publisher => &mut metadata.publisher,
        Field::ReleaseDate => &mut metadata.release_date,
        Field::Rating => &mut metadata.rating,
        Field::Overview => &mut metadata.overview,
    };

    if slot.is_none() {
        *slot = Some(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_sidecar() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<synopsis>
    <title>Halo: Combat Evolved</title>
    <developer>Bungie</developer>
    <publisher>Microsoft Game Studios</publisher>
    <release_date>2001-11-15</release_date>
    <rating>M</rating>
    <overview>Master Chief &amp; Cortana.</overview>
</synopsis>"#;

        let sidecar = parse_sidecar(xml).unwrap();
        assert_eq!(sidecar.title, "Halo: Combat Evolved");
        assert_eq!(sidecar.metadata.developer.as_deref(), Some("Bungie"));
        assert_eq!(
            sidecar.metadata.publisher.as_deref(),
            Some("Microsoft Game Studios")
        );
        assert_eq!(sidecar.metadata.release_date.as_deref(), Some("2001-11-15"));
        assert_eq!(sidecar.metadata.rating.as_deref(), Some("M"));
        assert_eq!(
            sidecar.metadata.overview.as_deref(),
            Some("Master Chief & Cortana.")
        );
    }

    #[test]
    fn test_parse_partial_sidecar() {
        let xml = "<game><info><title>Crazy Taxi 3</title></info></game>";
        let sidecar = parse_sidecar(xml).unwrap();
        assert_eq!(sidecar.title, "Crazy Taxi 3");
        assert_eq!(sidecar.metadata, TitleMetadata::default());
    }

    #[test]
    fn test_missing_title() {
        let xml = "<game><developer>Sega</developer></game>";
        assert!(matches!(
            parse_sidecar(xml),
            Err(SidecarError::MissingTitle)
        ));
    }

    #[test]
    fn test_empty_title_is_missing() {
        let xml = "<game><title>   </title></game>";
        assert!(matches!(
            parse_sidecar(xml),
            Err(SidecarError::MissingTitle)
        ));
    }

    #[test]
    fn test_malformed_sidecar() {
        let xml = "<game><title>Broken</developer></game>";
        assert!(matches!(parse_sidecar(xml), Err(SidecarError::Xml(_))));
    }
}
