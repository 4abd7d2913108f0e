//! Container image references.
//!
//! Handlers report the image of every task as an `ImageRef`:
//! - `Literal`: a concrete image string, with how it is pinned
//! - `Dynamic`: a parameter or expression resolved only at run time
//! - `Absent`: no image declared anywhere
//!
//! A per-task declaration beats the document default (`ImageRef::resolve`).

use serde::Serialize;

const DIGEST_MARKER: &str = "@sha256:";

/// How a literal image is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageSpecifier {
    Digest,
    Latest,
    Tag,
    NoTag,
    /// Dynamic image, not known until run time.
    Parameter,
}

impl ImageSpecifier {
    pub fn of_literal(image: &str) -> Self {
        if image.contains(DIGEST_MARKER) {
            return Self::Digest;
        }
        match tag_of(image) {
            Some("latest") => Self::Latest,
            Some(_) => Self::Tag,
            None => Self::NoTag,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digest => "DIGEST",
            Self::Latest => "LATEST",
            Self::Tag => "TAG",
            Self::NoTag => "NO_TAG",
            Self::Parameter => "PARAMETER",
        }
    }
}

/// Tag of an image string, ignoring a registry port.
fn tag_of(image: &str) -> Option<&str> {
    let last = image.rsplit('/').next().unwrap_or(image);
    last.split_once(':').map(|(_, tag)| tag)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    Literal { image: String, specifier: ImageSpecifier },
    Dynamic { expr: String },
    Absent,
}

impl ImageRef {
    /// Classify a declared image string.
    ///
    /// Blank declarations are absent. Strings starting with `$` (`$params.x`,
    /// `${...}`, `$(inputs.x)`) are dynamic.
    pub fn classify(raw: &str) -> Self {
        let s = raw.trim().trim_matches(|c| c == '"' || c == '\'');
        if s.is_empty() {
            return Self::Absent;
        }
        if s.starts_with('$') || s.contains("${") || s.contains("~{") {
            return Self::Dynamic { expr: s.to_string() };
        }
        Self::Literal {
            image: s.to_string(),
            specifier: ImageSpecifier::of_literal(s),
        }
    }

    pub fn dynamic(expr: impl Into<String>) -> Self {
        Self::Dynamic { expr: expr.into() }
    }

    /// Per-task declaration first, then the document default.
    pub fn resolve(per_task: Option<&str>, default: Option<&str>) -> Self {
        match per_task.map(Self::classify) {
            Some(r) if !r.is_absent() => r,
            _ => default.map(Self::classify).unwrap_or(Self::Absent),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Image text as shown in graph output.
    pub fn display(&self) -> Option<&str> {
        match self {
            Self::Literal { image, .. } => Some(image),
            Self::Dynamic { expr } => Some(expr),
            Self::Absent => None,
        }
    }

    pub fn specifier(&self) -> Option<ImageSpecifier> {
        match self {
            Self::Literal { specifier, .. } => Some(*specifier),
            Self::Dynamic { .. } => Some(ImageSpecifier::Parameter),
            Self::Absent => None,
        }
    }

    /// Web page of the image on its registry. Dynamic images have none.
    pub fn registry_url(&self) -> Option<String> {
        match self {
            Self::Literal { image, specifier } => registry_url(image, *specifier),
            _ => None,
        }
    }
}

/// Registry an image is hosted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Registry {
    QuayIo,
    DockerHub,
    GithubContainerRegistry,
    AmazonEcr,
    Gitlab,
    Other,
}

impl Registry {
    pub fn of(image: &str) -> Self {
        if image.starts_with("quay.io/") {
            Self::QuayIo
        } else if image.starts_with("ghcr.io/") {
            Self::GithubContainerRegistry
        } else if image.starts_with("registry.gitlab.com") {
            Self::Gitlab
        } else if image.starts_with("public.ecr.aws/") || image.contains(".dkr.ecr.") {
            Self::AmazonEcr
        } else if has_registry_host(image) {
            Self::Other
        } else {
            Self::DockerHub
        }
    }
}

/// True when the first path segment names a host (`gcr.io/x`, `localhost:5000/x`).
fn has_registry_host(image: &str) -> bool {
    match image.split_once('/') {
        Some((first, _)) => first.contains('.') || first.contains(':') || first == "localhost",
        None => false,
    }
}

/// Strip the tag or digest from an image string.
pub fn image_name(image: &str, specifier: ImageSpecifier) -> &str {
    if specifier == ImageSpecifier::Digest {
        return image.split_once('@').map_or(image, |(name, _)| name);
    }
    let split_at = image.rfind('/').map_or(0, |i| i + 1);
    match image[split_at..].find(':') {
        Some(i) => &image[..split_at + i],
        None => image,
    }
}

pub fn registry_url(image: &str, specifier: ImageSpecifier) -> Option<String> {
    let name = image_name(image, specifier);
    if name.is_empty() {
        return None;
    }

    let url = match Registry::of(name) {
        Registry::QuayIo => format!("https://quay.io/repository/{}", &name["quay.io/".len()..]),
        Registry::AmazonEcr => match name.strip_prefix("public.ecr.aws/") {
            Some(rest) => format!("https://gallery.ecr.aws/{rest}"),
            None => format!("https://{name}"),
        },
        Registry::DockerHub => {
            let parts: Vec<&str> = name.split('/').collect();
            match parts.len() {
                1 => format!("https://hub.docker.com/_/{name}"),
                2 => format!("https://hub.docker.com/r/{name}"),
                _ => format!("https://{name}"),
            }
        }
        Registry::GithubContainerRegistry | Registry::Gitlab | Registry::Other => {
            format!("https://{name}")
        }
    };
    Some(url)
}
