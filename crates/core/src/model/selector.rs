use thiserror::Error;

use crate::model::exam::ExamPartInfo;
use crate::model::ids::PartId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectorError {
    #[error("no parts were requested")]
    MissingParts,
}

/// Which parts of an exam an attempt covers, parsed from the `parts` query value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartsSelector {
    All,
    Explicit(Vec<PartId>),
}

impl PartsSelector {
    /// Parse `all` or a comma-separated list of part ids.
    ///
    /// Tokens that are not ids are skipped; an explicit list may therefore come
    /// back empty, which `resolve` turns into an empty selection.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::MissingParts` when the value is absent or blank.
    pub fn parse(raw: Option<&str>) -> Result<Self, SelectorError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(SelectorError::MissingParts);
        }
        if raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let mut ids = Vec::new();
        for token in raw.split(',') {
            if let Ok(id) = token.parse::<PartId>() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(Self::Explicit(ids))
    }

    /// Filter `parts` down to the selection, keeping the order of `parts`.
    #[must_use]
    pub fn resolve(&self, parts: &[ExamPartInfo]) -> Vec<ExamPartInfo> {
        match self {
            Self::All => parts.to_vec(),
            Self::Explicit(ids) => parts
                .iter()
                .filter(|part| ids.contains(&part.part_id))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::exam::PartNumber;

    fn parts() -> Vec<ExamPartInfo> {
        (1..=7)
            .map(|n| ExamPartInfo {
                part_id: PartId::new(100 + u64::from(n)),
                part_number: PartNumber::new(n).unwrap(),
                part_name: format!("Part {n}"),
            })
            .collect()
    }

    #[test]
    fn missing_or_blank_is_an_error() {
        assert_eq!(PartsSelector::parse(None), Err(SelectorError::MissingParts));
        assert_eq!(PartsSelector::parse(Some("  ")), Err(SelectorError::MissingParts));
    }

    #[test]
    fn all_keeps_every_part() {
        let selector = PartsSelector::parse(Some("ALL")).unwrap();
        assert!(selector.is_all());
        assert_eq!(selector.resolve(&parts()).len(), 7);
    }

    #[test]
    fn explicit_list_keeps_exam_order() {
        let selector = PartsSelector::parse(Some("105, 101,nope,105")).unwrap();
        assert_eq!(
            selector,
            PartsSelector::Explicit(vec![PartId::new(105), PartId::new(101)])
        );
        let resolved = selector.resolve(&parts());
        let numbers: Vec<u8> = resolved.iter().map(|p| p.part_number.value()).collect();
        assert_eq!(numbers, vec![1, 5]);
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        let selector = PartsSelector::parse(Some("999")).unwrap();
        assert!(selector.resolve(&parts()).is_empty());
    }
}
