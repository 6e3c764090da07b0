use crate::error::ChangeError;
use crate::model::{ChangeRecord, PatchSet};

/// Outcome of choosing a patch set without blocking on input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatchSetSelection<'a> {
    Selected(&'a PatchSet),
    /// Several patch sets and no request; the caller decides how to choose.
    SelectionRequired(&'a [PatchSet]),
}

pub fn select_patch_set<'a>(
    change: &'a ChangeRecord,
    requested: Option<&str>,
) -> Result<PatchSetSelection<'a>, ChangeError> {
    if change.patch_sets.is_empty() {
        return Err(ChangeError::NoPatchSets);
    }
    match requested {
        Some(requested) => change
            .patch_set(requested)
            .map(PatchSetSelection::Selected)
            .ok_or_else(|| ChangeError::UnknownPatchSet {
                requested: requested.to_string(),
            }),
        None => match change.patch_sets.as_slice() {
            [only] => Ok(PatchSetSelection::Selected(only)),
            all => Ok(PatchSetSelection::SelectionRequired(all)),
        },
    }
}

/// Revision behind the patch-set filter.
///
/// A filter that names no patch set is an error; no filter, or a patch set
/// without a recorded revision, resolves to `None`.
pub fn revision_for<'a>(
    change: &'a ChangeRecord,
    filter: Option<&str>,
) -> Result<Option<&'a str>, ChangeError> {
    let Some(filter) = filter else {
        return Ok(None);
    };
    let patch_set = change
        .patch_set(filter)
        .ok_or_else(|| ChangeError::UnknownPatchSet {
            requested: filter.to_string(),
        })?;
    Ok(patch_set.revision.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(value: serde_json::Value) -> ChangeRecord {
        ChangeRecord::from_json(value.as_object().unwrap())
    }

    #[test]
    fn test_requested_patch_set() {
        let record = change(json!({"patchSets": [
            {"number": 1, "revision": "aaa"},
            {"number": 2, "revision": "bbb"}
        ]}));
        let selection = select_patch_set(&record, Some("2")).unwrap();
        assert!(matches!(selection, PatchSetSelection::Selected(ps) if ps.number == 2));
    }

    #[test]
    fn test_unknown_patch_set() {
        let record = change(json!({"patchSets": [{"number": 1}]}));
        let err = select_patch_set(&record, Some("9")).unwrap_err();
        assert!(matches!(err, ChangeError::UnknownPatchSet { ref requested } if requested == "9"));
    }

    #[test]
    fn test_single_patch_set_needs_no_choice() {
        let record = change(json!({"patchSets": [{"number": 4}]}));
        let selection = select_patch_set(&record, None).unwrap();
        assert!(matches!(selection, PatchSetSelection::Selected(ps) if ps.number == 4));
    }

    #[test]
    fn test_several_patch_sets_require_selection() {
        let record = change(json!({"patchSets": [{"number": 2}, {"number": 1}]}));
        match select_patch_set(&record, None).unwrap() {
            PatchSetSelection::SelectionRequired(all) => {
                let numbers: Vec<_> = all.iter().map(|ps| ps.number).collect();
                assert_eq!(numbers, vec![1, 2]);
            }
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn test_no_patch_sets() {
        let record = change(json!({"comments": {}}));
        assert!(matches!(
            select_patch_set(&record, None),
            Err(ChangeError::NoPatchSets)
        ));
    }

    #[test]
    fn test_revision_resolution() {
        let record = change(json!({"patchSets": [
            {"number": 1, "revision": "aaa"},
            {"number": 2}
        ]}));
        assert_eq!(revision_for(&record, Some("1")).unwrap(), Some("aaa"));
        assert_eq!(revision_for(&record, Some("2")).unwrap(), None);
        assert_eq!(revision_for(&record, None).unwrap(), None);
        assert!(matches!(
            revision_for(&record, Some("3")),
            Err(ChangeError::UnknownPatchSet { .. })
        ));
    }
}
