//! Catalog and editorial content loaded from disk.
//!
//! The content directory holds the shop's read-only data:
//!
//! ```text
//! content/
//!   products.json      catalog products
//!   treatments.json    salon treatments
//!   courses.json       online courses
//!   ingredients.json   ingredient glossary
//!   forum.json         forum threads with replies
//!   articles/*.md      articles (YAML frontmatter + markdown)
//!   blog/*.md          blog posts (YAML frontmatter + markdown)
//! ```
//!
//! Everything is loaded once at startup. A single unreadable markdown file is
//! logged and skipped; an unreadable JSON file fails the load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use vitalis_core::{Price, ProductId};

/// Words per minute used for reading time estimates.
const WORDS_PER_MINUTE: usize = 200;

/// A catalog product.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub slug: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Slugs into the ingredient glossary.
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

/// A salon treatment.
#[derive(Debug, Clone, Deserialize)]
pub struct Treatment {
    pub slug: String,
    pub name: String,
    pub price: Price,
    pub duration_minutes: u32,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An online course.
#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub slug: String,
    pub title: String,
    pub price: Price,
    pub lessons: u32,
    #[serde(default)]
    pub level: Option<String>,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An entry in the ingredient glossary.
#[derive(Debug, Clone, Deserialize)]
pub struct Ingredient {
    pub slug: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
}

/// A forum reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ForumReply {
    pub author: String,
    pub posted_at: NaiveDate,
    pub body: String,
    #[serde(skip_deserializing)]
    pub body_html: String,
}

/// A forum thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ForumThread {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub posted_at: NaiveDate,
    pub body: String,
    #[serde(skip_deserializing)]
    pub body_html: String,
    #[serde(default)]
    pub replies: Vec<ForumReply>,
}

/// Frontmatter of an article or blog post.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub published_at: NaiveDate,
    #[serde(default)]
    pub updated_at: Option<NaiveDate>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

/// A rendered article or blog post.
#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub meta: PostMeta,
    pub content_html: String,
    pub reading_time_minutes: u32,
}

/// Item counts, for startup logs and `vitalis-cli content check`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentSummary {
    pub products: usize,
    pub treatments: usize,
    pub courses: usize,
    pub ingredients: usize,
    pub threads: usize,
    pub articles: usize,
    pub blog_posts: usize,
}

/// All loaded content, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    products: Arc<Vec<Product>>,
    treatments: Arc<Vec<Treatment>>,
    courses: Arc<Vec<Course>>,
    ingredients: Arc<HashMap<String, Ingredient>>,
    threads: Arc<Vec<ForumThread>>,
    articles: Arc<Vec<Post>>,
    blog: Arc<Vec<Post>>,
}

impl ContentStore {
    /// Load all content from `content_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing, or a JSON file cannot be
    /// read or parsed, or two catalog entries share a slug.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        if !content_dir.is_dir() {
            return Err(ContentError::MissingDirectory(content_dir.to_path_buf()));
        }

        let products: Vec<Product> = load_json(&content_dir.join("products.json"))?;
        ensure_unique(&products, |p| p.slug.as_str(), "products.json")?;
        let treatments: Vec<Treatment> = load_json(&content_dir.join("treatments.json"))?;
        ensure_unique(&treatments, |t| t.slug.as_str(), "treatments.json")?;
        let courses: Vec<Course> = load_json(&content_dir.join("courses.json"))?;
        ensure_unique(&courses, |c| c.slug.as_str(), "courses.json")?;

        let ingredients = load_json::<Ingredient>(&content_dir.join("ingredients.json"))?
            .into_iter()
            .map(|i| (i.slug.clone(), i))
            .collect();

        let mut threads: Vec<ForumThread> = load_json(&content_dir.join("forum.json"))?;
        ensure_unique(&threads, |t| t.slug.as_str(), "forum.json")?;
        for thread in &mut threads {
            thread.body_html = render_markdown(&thread.body);
            for reply in &mut thread.replies {
                reply.body_html = render_markdown(&reply.body);
            }
        }
        threads.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));

        let store = Self {
            products: Arc::new(products),
            treatments: Arc::new(treatments),
            courses: Arc::new(courses),
            ingredients: Arc::new(ingredients),
            threads: Arc::new(threads),
            articles: Arc::new(load_posts(&content_dir.join("articles"))?),
            blog: Arc::new(load_posts(&content_dir.join("blog"))?),
        };

        tracing::info!(summary = ?store.summary(), "Content loaded");
        Ok(store)
    }

    /// Item counts per kind.
    #[must_use]
    pub fn summary(&self) -> ContentSummary {
        ContentSummary {
            products: self.products.len(),
            treatments: self.treatments.len(),
            courses: self.courses.len(),
            ingredients: self.ingredients.len(),
            threads: self.threads.len(),
            articles: self.published_articles().count(),
            blog_posts: self.published_blog_posts().count(),
        }
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Get a product by slug.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.slug == id)
    }

    /// Featured products for the home page.
    #[must_use]
    pub fn featured_products(&self, limit: usize) -> Vec<&Product> {
        self.products.iter().filter(|p| p.featured).take(limit).collect()
    }

    /// Ingredients of `product` that exist in the glossary.
    #[must_use]
    pub fn ingredients_for(&self, product: &Product) -> Vec<&Ingredient> {
        product
            .ingredients
            .iter()
            .filter_map(|slug| self.ingredients.get(slug))
            .collect()
    }

    /// All treatments.
    #[must_use]
    pub fn treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    /// Get a treatment by slug.
    #[must_use]
    pub fn treatment(&self, slug: &str) -> Option<&Treatment> {
        self.treatments.iter().find(|t| t.slug == slug)
    }

    /// All courses.
    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Get a course by slug.
    #[must_use]
    pub fn course(&self, slug: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.slug == slug)
    }

    /// Forum threads, newest first.
    #[must_use]
    pub fn threads(&self) -> &[ForumThread] {
        &self.threads
    }

    /// Get a forum thread by slug.
    #[must_use]
    pub fn thread(&self, slug: &str) -> Option<&ForumThread> {
        self.threads.iter().find(|t| t.slug == slug)
    }

    /// Published articles, newest first.
    pub fn published_articles(&self) -> impl Iterator<Item = &Post> {
        self.articles.iter().filter(|p| !p.meta.draft)
    }

    /// Get a published article by slug.
    #[must_use]
    pub fn article(&self, slug: &str) -> Option<&Post> {
        self.published_articles().find(|p| p.slug == slug)
    }

    /// Published blog posts, newest first.
    pub fn published_blog_posts(&self) -> impl Iterator<Item = &Post> {
        self.blog.iter().filter(|p| !p.meta.draft)
    }

    /// Get a published blog post by slug.
    #[must_use]
    pub fn blog_post(&self, slug: &str) -> Option<&Post> {
        self.published_blog_posts().find(|p| p.slug == slug)
    }
}

/// Read a JSON array file. A missing file is an empty list.
fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ContentError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Content file does not exist");
        return Ok(Vec::new());
    }

    let text = std::fs::read_to_string(path).map_err(|e| ContentError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ContentError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn ensure_unique<T>(items: &[T], slug: impl Fn(&T) -> &str, file: &str) -> Result<(), ContentError> {
    let mut seen = std::collections::HashSet::new();
    for item in items {
        let slug = slug(item);
        if !seen.insert(slug) {
            return Err(ContentError::DuplicateSlug {
                file: file.to_owned(),
                slug: slug.to_owned(),
            });
        }
    }
    Ok(())
}

/// Load every markdown file in `dir`, newest first.
fn load_posts(dir: &Path) -> Result<Vec<Post>, ContentError> {
    let mut posts = Vec::new();

    if !dir.exists() {
        tracing::info!(dir = %dir.display(), "Post directory does not exist");
        return Ok(posts);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ContentError::Io {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            match load_post(&path) {
                Ok(post) => {
                    tracing::debug!(slug = %post.slug, "Loaded post");
                    posts.push(post);
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to load post");
                }
            }
        }
    }

    posts.sort_by(|a, b| {
        b.meta
            .published_at
            .cmp(&a.meta.published_at)
            .then_with(|| a.slug.cmp(&b.slug))
    });
    Ok(posts)
}

fn load_post(path: &Path) -> Result<Post, ContentError> {
    let text = std::fs::read_to_string(path).map_err(|e| ContentError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let parse_error = |message: String| ContentError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| parse_error("invalid filename".to_owned()))?;
    let slug = slug_from_filename(stem).to_owned();

    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PostMeta> = matter
        .parse(&text)
        .map_err(|e| parse_error(format!("failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| parse_error("missing frontmatter".to_owned()))?;

    Ok(Post {
        slug,
        meta,
        content_html: render_markdown(&parsed.content),
        reading_time_minutes: reading_time_minutes(&parsed.content),
    })
}

/// Strip a `YYYY-MM-DD-` prefix from a file stem.
fn slug_from_filename(stem: &str) -> &str {
    let bytes = stem.as_bytes();
    let dated = bytes.len() > 11
        && bytes.iter().take(10).enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
        && bytes.get(10) == Some(&b'-');

    if dated { stem.get(11..).unwrap_or(stem) } else { stem }
}

fn reading_time_minutes(markdown: &str) -> u32 {
    let words = markdown.split_whitespace().count();
    u32::try_from(words.div_ceil(WORDS_PER_MINUTE))
        .unwrap_or(u32::MAX)
        .max(1)
}

/// Render markdown to HTML with GitHub Flavored Markdown extensions. Raw HTML
/// in the source is escaped.
#[must_use]
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    markdown_to_html(content, &options)
}

/// Content loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("duplicate slug {slug:?} in {file}")]
    DuplicateSlug { file: String, slug: String },
}
