use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

impl CallRequest {
    /// Full dialled number, or `None` when either part is missing or blank.
    pub fn destination(&self) -> Option<String> {
        let country_code = self.country_code.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let phone_number = self.phone_number.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(format!("{}{}", country_code, phone_number))
    }

    pub fn extension(&self) -> String {
        self.extension.as_deref().map(str::trim).unwrap_or_default().to_string()
    }
}
