//! Naming helpers for projects, environments and stored parameters.

use crate::error::ConfigError;

/// Check a project name: `a-z` first, `a-z0-9` last, only `a-z0-9_-` in between.
///
/// Valid: `my_project`, `my-project`, `my-1-project`.
/// Invalid: `my project`, `1-my-project`, `-my-project`, `my-project-`.
pub fn validate_project_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidProjectName {
        name: name.to_string(),
        reason,
    };
    let bytes = name.as_bytes();
    let (first, last) = match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(invalid("project name is empty")),
    };
    if !first.is_ascii_lowercase() {
        return Err(invalid("first letter has to be a-z"));
    }
    if !(last.is_ascii_lowercase() || last.is_ascii_digit()) {
        return Err(invalid("last letter has to be a-z or 0-9"));
    }
    if !bytes
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
    {
        return Err(invalid("only a-z, 0-9, - and _ are allowed"));
    }
    Ok(())
}

/// Check an env name: `a-z` first, then only `a-z0-9`, no delimiters.
///
/// Valid: `dev`, `test`, `prod`, `stage1`. Invalid: `my_dev`, `dev-`, `1dev`.
pub fn validate_env_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidEnvName {
        name: name.to_string(),
        reason,
    };
    let bytes = name.as_bytes();
    match bytes.first() {
        None => return Err(invalid("env name is empty")),
        Some(first) if !first.is_ascii_lowercase() => {
            return Err(invalid("first letter has to be a-z"));
        }
        Some(_) => {}
    }
    if !bytes.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()) {
        return Err(invalid("only a-z and 0-9 are allowed"));
    }
    Ok(())
}

/// Parameter names may not start with `aws` or `ssm`; such names get a `p-` prefix.
pub fn normalize_parameter_name(name: &str) -> String {
    if name.starts_with("aws") || name.starts_with("ssm") {
        format!("p-{}", name)
    } else {
        name.to_string()
    }
}

/// Lowercase the alphanumeric words of `name` and join them with `delim`.
pub fn slugify(name: &str, delim: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(delim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_project_names() {
        for name in ["my_project", "my-project", "my_1_project", "my1project", "myproject1"] {
            assert!(validate_project_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_project_names() {
        for name in ["my project", "1-my-project", "-my-project", "my-project-", "", "My-project"] {
            assert!(validate_project_name(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn test_project_name_error_reason() {
        let err = validate_project_name("my-project-").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid project name \"my-project-\": last letter has to be a-z or 0-9"
        );
    }

    #[test]
    fn test_valid_env_names() {
        for name in ["dev", "test", "prod", "stage1", "stage2"] {
            assert!(validate_env_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_env_names() {
        for name in ["my_dev", "my-dev", "dev_", "dev-", "1dev", "", "Dev"] {
            assert!(validate_env_name(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn test_normalize_parameter_name() {
        assert_eq!(normalize_parameter_name("aws"), "p-aws");
        assert_eq!(normalize_parameter_name("aws-project"), "p-aws-project");
        assert_eq!(normalize_parameter_name("ssm"), "p-ssm");
        assert_eq!(normalize_parameter_name("ssm-project"), "p-ssm-project");
        assert_eq!(normalize_parameter_name("my_project-dev"), "my_project-dev");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("my_project", "-"), "my-project");
        assert_eq!(slugify("my-project", "_"), "my_project");
        assert_eq!(slugify("My  Project__1", "-"), "my-project-1");
        assert_eq!(slugify("", "-"), "");
    }
}
