use crate::error::MalformedResponseError;

/// Extract the `rel="next"` target from an RFC 8288 style `link` header.
///
/// The platform sends `<url>; rel="current",<url>; rel="next",...`. Returns
/// `Ok(None)` when there is no next relation (last page).
///
/// # Errors
///
/// Returns `MalformedResponseError::LinkHeader` when a next relation is present
/// but its target is not wrapped in angle brackets or is empty.
pub fn parse_next_link(header: &str) -> Result<Option<String>, MalformedResponseError> {
    for part in header.split(',') {
        let mut segments = part.split(';');
        let target = segments.next().unwrap_or_default().trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if !is_next {
            continue;
        }

        let url = target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| MalformedResponseError::LinkHeader(part.trim().to_owned()))?;
        return Ok(Some(url.to_owned()));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_next_among_other_relations() {
        let header = concat!(
            r#"<https://lms.test/api/v1/courses/1/modules?page=1&per_page=100>; rel="current","#,
            r#"<https://lms.test/api/v1/courses/1/modules?page=2&per_page=100>; rel="next","#,
            r#"<https://lms.test/api/v1/courses/1/modules?page=1&per_page=100>; rel="first","#,
            r#"<https://lms.test/api/v1/courses/1/modules?page=4&per_page=100>; rel="last""#,
        );
        assert_eq!(
            parse_next_link(header).unwrap().as_deref(),
            Some("https://lms.test/api/v1/courses/1/modules?page=2&per_page=100")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let header = r#"<https://lms.test/api/v1/x?page=4>; rel="current", <https://lms.test/api/v1/x?page=1>; rel="first""#;
        assert_eq!(parse_next_link(header).unwrap(), None);
        assert_eq!(parse_next_link("").unwrap(), None);
    }

    #[test]
    fn next_without_brackets_is_malformed() {
        let err = parse_next_link(r#"https://lms.test/api/v1/x?page=2; rel="next""#).unwrap_err();
        assert!(matches!(err, MalformedResponseError::LinkHeader(_)));

        let err = parse_next_link(r#"<>; rel="next""#).unwrap_err();
        assert!(matches!(err, MalformedResponseError::LinkHeader(_)));
    }
}
