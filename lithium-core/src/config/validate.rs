use std::collections::HashSet;

use super::{ConfigError, types::Config};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.pages.is_empty() {
        return Err(invalid("at least one page must be configured"));
    }

    let mut names = HashSet::new();
    let mut recent_pages = 0;
    for page in &config.pages {
        if page.name.trim().is_empty() {
            return Err(invalid("page name cannot be empty"));
        }
        if !names.insert(page.name.to_lowercase()) {
            return Err(invalid(&format!("duplicate page name '{}'", page.name)));
        }
        if page.recent {
            recent_pages += 1;
            if !page.paths.is_empty() {
                return Err(invalid(&format!(
                    "recent page '{}' cannot have search paths",
                    page.name
                )));
            }
        }
    }
    if recent_pages > 1 {
        return Err(invalid("only one recent page is allowed"));
    }

    if config.scan.marker.trim().is_empty() {
        return Err(invalid("scan.marker cannot be empty"));
    }
    if config.scan.max_items_per_page == 0 {
        return Err(invalid("scan.max_items_per_page cannot be 0"));
    }
    if config.scan.resort_interval == 0 {
        return Err(invalid("scan.resort_interval cannot be 0"));
    }

    let thumbs = &config.thumbnails;
    if thumbs.colour_depth != 16 && thumbs.colour_depth != 32 {
        return Err(invalid(&format!(
            "thumbnails.colour_depth must be 16 or 32, got {}",
            thumbs.colour_depth
        )));
    }
    if thumbs.max_dimension == 0 {
        return Err(invalid("thumbnails.max_dimension cannot be 0"));
    }
    if thumbs.pool_size == 0 {
        return Err(invalid("thumbnails.pool_size cannot be 0"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PageConfig, SortMode};
    use std::path::PathBuf;

    fn page(name: &str, recent: bool) -> PageConfig {
        PageConfig {
            name: name.to_string(),
            paths: if recent {
                Vec::new()
            } else {
                vec![PathBuf::from("/games")]
            },
            sort: SortMode::Name,
            recent,
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_no_pages_fails() {
        let config = Config {
            pages: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_duplicate_names_fails() {
        let config = Config {
            pages: vec![page("Games", false), page("games", false)],
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_recent_with_paths_fails() {
        let mut recent = page("Recent", true);
        recent.paths.push(PathBuf::from("/games"));
        let config = Config {
            pages: vec![recent],
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_colour_depth() {
        let mut config = Config::default();
        config.thumbnails.colour_depth = 24;
        assert!(validate_config(&config).is_err());

        config.thumbnails.colour_depth = 16;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_resort_interval_fails() {
        let mut config = Config::default();
        config.scan.resort_interval = 0;
        assert!(validate_config(&config).is_err());
    }
}
