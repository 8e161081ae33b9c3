//! Identifiers handed to the container engine.

use serde::Serialize;
use std::fmt;

macro_rules! engine_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

engine_id!(
    /// Image reference produced by a build or commit, e.g. `local_discourse/app`.
    ImageTag
);

engine_id!(
    /// Name of a container known to the container engine.
    ContainerName
);

impl ImageTag {
    /// The conventional `{namespace}/{config}` tag.
    pub fn default_for(namespace: &str, config: &str) -> Self {
        Self(format!("{namespace}/{config}"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for ImageTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}
