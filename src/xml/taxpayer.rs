use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{XmlElement, XmlError};

/// Taxpayer identity printed in every envelope header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub tax_number: u64,
    pub tax_payer_type: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub post_number: u32,
    pub birth_date: String,
}

impl PersonalInfo {
    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, XmlError> {
        let content = std::fs::read_to_string(path).map_err(|source| XmlError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| XmlError::TaxpayerInfo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `edp:Header` holding the `edp:taxpayer` block.
    pub fn header(&self) -> XmlElement {
        let fields = [
            ("edp:taxNumber", self.tax_number.to_string()),
            ("edp:taxpayerType", self.tax_payer_type.clone()),
            ("edp:name", self.name.clone()),
            ("edp:address1", self.address.clone()),
            ("edp:city", self.city.clone()),
            ("edp:postNumber", self.post_number.to_string()),
            ("edp:birthDate", self.birth_date.clone()),
        ];

        let taxpayer = fields
            .into_iter()
            .fold(XmlElement::new("edp:taxpayer"), |el, (name, value)| {
                el.child(XmlElement::with_text(name, value))
            });

        XmlElement::new("edp:Header").child(taxpayer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> PersonalInfo {
        PersonalInfo {
            tax_number: 12345678,
            tax_payer_type: "FO".to_string(),
            name: "Jana Novak".to_string(),
            address: "Slovenska cesta 1".to_string(),
            city: "Ljubljana".to_string(),
            post_number: 1000,
            birth_date: "1990-01-31".to_string(),
        }
    }

    #[test]
    fn test_header_field_names() {
        let header = sample().header();
        let taxpayer = header.find("edp:taxpayer").unwrap();
        let names: Vec<&str> = taxpayer.children().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "edp:taxNumber",
                "edp:taxpayerType",
                "edp:name",
                "edp:address1",
                "edp:city",
                "edp:postNumber",
                "edp:birthDate",
            ]
        );
        assert_eq!(
            taxpayer.find("edp:taxNumber").and_then(|e| e.text_content()),
            Some("12345678")
        );
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taxpayer.json");
        std::fs::write(&path, serde_json::to_string(&sample()).unwrap()).unwrap();
        assert_eq!(PersonalInfo::from_file(&path).unwrap(), sample());
    }

    #[test]
    fn test_from_file_rejects_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taxpayer.json");
        std::fs::write(&path, r#"{"tax_number": "abc"}"#).unwrap();
        assert!(matches!(
            PersonalInfo::from_file(&path),
            Err(XmlError::TaxpayerInfo { .. })
        ));
        assert!(matches!(
            PersonalInfo::from_file(&dir.path().join("missing.json")),
            Err(XmlError::Io { .. })
        ));
    }
}
