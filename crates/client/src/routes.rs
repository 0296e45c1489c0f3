//! Screen addresses shared by the shell and the workflow.

use std::fmt;

use plate_core::{ImageHash, RecipeFilter, CUISINE_KEY, DIETARY_PREFERENCE_KEY};
use reqwest::Url;
use thiserror::Error;

pub const LIST_PATH: &str = "/";
pub const DETAIL_PATH: &str = "/recipe-detail";
pub const FINDER_PATH: &str = "/recipe-finder";

const IMAGE_HASH_KEY: &str = "image_hash";
const OPEN_MODAL_KEY: &str = "openModal";
// Only used to borrow Url's query encoding; never dereferenced.
const ROUTE_ORIGIN: &str = "app://local";

/// An href that doesn't name a known screen.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("malformed route `{0}`")]
    Malformed(String),
    #[error("unknown route path `{0}`")]
    UnknownPath(String),
    #[error("route `{path}` requires `{param}`")]
    MissingParam { path: &'static str, param: &'static str },
}

/// A screen and its parameters. Renders to and parses from `path?query`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Recipe list, optionally filtered by tag.
    RecipeList { filter: RecipeFilter },
    /// One recipe, addressed by its image hash.
    RecipeDetail { image_hash: ImageHash },
    /// Snap & cook screen; `open_modal` presents the source picker on entry.
    RecipeFinder { open_modal: bool },
}

impl Route {
    pub fn home() -> Self {
        Route::RecipeList {
            filter: RecipeFilter::all(),
        }
    }

    /// Target of the floating camera button.
    pub fn snap() -> Self {
        Route::RecipeFinder { open_modal: true }
    }

    pub fn detail(image_hash: ImageHash) -> Self {
        Route::RecipeDetail { image_hash }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::RecipeList { .. } => LIST_PATH,
            Route::RecipeDetail { .. } => DETAIL_PATH,
            Route::RecipeFinder { .. } => FINDER_PATH,
        }
    }

    fn params(&self) -> Vec<(&'static str, &str)> {
        match self {
            Route::RecipeList { filter } => filter.query_pairs(),
            Route::RecipeDetail { image_hash } => vec![(IMAGE_HASH_KEY, image_hash.as_str())],
            Route::RecipeFinder { open_modal: true } => vec![(OPEN_MODAL_KEY, "true")],
            Route::RecipeFinder { open_modal: false } => vec![],
        }
    }

    /// `path?query` form, omitting absent params.
    pub fn to_href(&self) -> String {
        let params = self.params();
        if params.is_empty() {
            return self.path().to_string();
        }
        let mut url = match Url::parse(ROUTE_ORIGIN) {
            Ok(url) => url,
            Err(_) => return self.path().to_string(),
        };
        url.query_pairs_mut().extend_pairs(params);
        format!("{}?{}", self.path(), url.query().unwrap_or_default())
    }

    pub fn parse(href: &str) -> Result<Self, RouteError> {
        let url = Url::parse(ROUTE_ORIGIN)
            .and_then(|origin| origin.join(href))
            .map_err(|_| RouteError::Malformed(href.to_string()))?;
        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };

        match url.path() {
            LIST_PATH | "" | "/index" => Ok(Route::RecipeList {
                filter: RecipeFilter {
                    cuisine: param(CUISINE_KEY),
                    dietary_preference: param(DIETARY_PREFERENCE_KEY),
                },
            }),
            DETAIL_PATH => {
                let hash = param(IMAGE_HASH_KEY).ok_or(RouteError::MissingParam {
                    path: DETAIL_PATH,
                    param: IMAGE_HASH_KEY,
                })?;
                Ok(Route::RecipeDetail {
                    image_hash: ImageHash::from_str(hash),
                })
            }
            FINDER_PATH => Ok(Route::RecipeFinder {
                open_modal: matches!(param(OPEN_MODAL_KEY).as_deref(), Some("true" | "1")),
            }),
            other => Err(RouteError::UnknownPath(other.to_string())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_href())
    }
}

/// Screen switcher owned by the presentation shell.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrefs_omit_absent_params() {
        assert_eq!(Route::home().to_href(), "/");
        assert_eq!(
            Route::RecipeList {
                filter: RecipeFilter::by_cuisine("Thai")
            }
            .to_href(),
            "/?cuisine=Thai"
        );
        assert_eq!(
            Route::RecipeList {
                filter: RecipeFilter::by_dietary_preference("Gluten Free")
            }
            .to_href(),
            "/?dietary_preference=Gluten+Free"
        );
        assert_eq!(Route::snap().to_href(), "/recipe-finder?openModal=true");
        assert_eq!(
            Route::RecipeFinder { open_modal: false }.to_href(),
            "/recipe-finder"
        );
    }

    #[test]
    fn routes_survive_their_href_form() {
        let routes = [
            Route::home(),
            Route::detail(ImageHash::from_str("abc123")),
            Route::snap(),
            Route::RecipeFinder { open_modal: false },
            Route::RecipeList {
                filter: RecipeFilter {
                    cuisine: Some("Indian".into()),
                    dietary_preference: Some("Vegan & Raw".into()),
                },
            },
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.to_href()).unwrap(), route);
        }
    }

    #[test]
    fn detail_requires_a_hash() {
        assert_eq!(
            Route::parse("/recipe-detail"),
            Err(RouteError::MissingParam {
                path: DETAIL_PATH,
                param: IMAGE_HASH_KEY
            })
        );
        assert_eq!(
            Route::parse("/recipe-detail?image_hash="),
            Err(RouteError::MissingParam {
                path: DETAIL_PATH,
                param: IMAGE_HASH_KEY
            })
        );
    }

    #[test]
    fn unknown_paths_are_errors() {
        assert_eq!(
            Route::parse("/settings"),
            Err(RouteError::UnknownPath("/settings".into()))
        );
    }
}
