use serde::Deserialize;
use uuid::Uuid;

use super::error::ProvisionError;
use super::slug::create_code;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// JSON body of `POST /repository/create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateRepositoryRequest {
    /// Parse and validate a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self, ProvisionError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| ProvisionError::Validation(e.to_string()))?;
        if request.name.is_empty() {
            return Err(ProvisionError::Validation("name must not be empty".into()));
        }
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Metadata row for one provisioned repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    pub id: String,
    pub name: String,
    pub code: String,
    pub description: String,
    pub path: String,
}

impl RepositoryRecord {
    pub fn new(request: CreateRepositoryRequest, id: Uuid, git_root: &str) -> Self {
        let id = id.hyphenated().to_string();
        let code = create_code(&request.name);
        let path = repository_path(git_root, &code, &id);
        Self {
            id,
            name: request.name,
            code,
            description: request.description.unwrap_or_default(),
            path,
        }
    }
}

/// `{git_root}/{code}-{id}.git`, verbatim.
pub fn repository_path(git_root: &str, code: &str, id: &str) -> String {
    format!("{git_root}/{code}-{id}.git")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<CreateRepositoryRequest, ProvisionError> {
        CreateRepositoryRequest::parse(body.as_bytes())
    }

    #[test]
    fn parses_name_and_description() {
        let req = parse(r#"{"name":"Widget","description":"tools"}"#).unwrap();
        assert_eq!(req.name, "Widget");
        assert_eq!(req.description.as_deref(), Some("tools"));
    }

    #[test]
    fn description_is_optional_and_nullable() {
        assert!(parse(r#"{"name":"Widget"}"#).unwrap().description.is_none());
        assert!(parse(r#"{"name":"Widget","description":null}"#)
            .unwrap()
            .description
            .is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse("{not json"), Err(ProvisionError::Validation(_))));
        assert!(matches!(parse(""), Err(ProvisionError::Validation(_))));
    }

    #[test]
    fn rejects_missing_or_mistyped_name() {
        assert!(matches!(parse("{}"), Err(ProvisionError::Validation(_))));
        assert!(matches!(parse(r#"{"name":null}"#), Err(ProvisionError::Validation(_))));
        assert!(matches!(parse(r#"{"name":42}"#), Err(ProvisionError::Validation(_))));
    }

    #[test]
    fn rejects_empty_name() {
        let err = parse(r#"{"name":""}"#).unwrap_err();
        assert_eq!(err.to_string(), "invalid request: name must not be empty");
    }

    #[test]
    fn whitespace_name_is_accepted() {
        let req = parse(r#"{"name":"   "}"#).unwrap();
        let record = RepositoryRecord::new(req, Uuid::nil(), "/srv/git");
        assert_eq!(record.code, "---");
        assert_eq!(
            record.path,
            "/srv/git/----00000000-0000-0000-0000-000000000000.git"
        );
    }

    #[test]
    fn record_path_is_root_code_and_id() {
        let id = Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        let req = parse(r#"{"name":"My Repo"}"#).unwrap();
        let record = RepositoryRecord::new(req, id, "/srv/git");

        assert_eq!(record.id, "0f8fad5b-d9cb-469f-a165-70867728950e");
        assert_eq!(record.code, "my-repo");
        assert_eq!(record.description, "");
        assert_eq!(
            record.path,
            "/srv/git/my-repo-0f8fad5b-d9cb-469f-a165-70867728950e.git"
        );
    }

    #[test]
    fn empty_code_still_yields_a_path() {
        assert_eq!(repository_path("/srv/git", "", "abc"), "/srv/git/-abc.git");
    }
}
