//! Content directory checks.

use std::path::Path;

use vitalis_storefront::content::{ContentError, ContentStore, ContentSummary};

/// Load the content directory and print what was found.
///
/// # Errors
///
/// Returns the load error if the directory cannot be loaded.
pub fn check(dir: &Path) -> Result<ContentSummary, ContentError> {
    tracing::info!(dir = %dir.display(), "Checking content");
    let summary = ContentStore::load(dir)?.summary();

    #[allow(clippy::print_stdout)]
    {
        println!("Content in {}", dir.display());
        println!("  products:    {}", summary.products);
        println!("  treatments:  {}", summary.treatments);
        println!("  courses:     {}", summary.courses);
        println!("  ingredients: {}", summary.ingredients);
        println!("  threads:     {}", summary.threads);
        println!("  articles:    {}", summary.articles);
        println!("  blog posts:  {}", summary.blog_posts);
    }

    Ok(summary)
}
