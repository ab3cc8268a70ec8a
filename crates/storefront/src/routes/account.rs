//! Member account route handlers.
//!
//! These routes sit behind the auth gate and also extract [`RequireAuth`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::ProfileRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{ProfilePreferences, ProfileUpdate, SkinType, UserProfile, session_keys};
use crate::routes::PageContext;
use crate::state::AppState;

/// Longest accepted display name, in characters.
const MAX_DISPLAY_NAME_LENGTH: usize = 80;

/// Query parameters for the dashboard.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub saved: Option<String>,
}

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub skin_type: Option<String>,
    /// Comma-separated.
    pub skin_concerns: Option<String>,
    /// Checkbox, present when ticked.
    pub newsletter: Option<String>,
    /// Comma-separated.
    pub interests: Option<String>,
}

/// Member dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "account/dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub profile: UserProfile,
    pub skin_types: [SkinType; 5],
    pub saved: bool,
}

impl DashboardTemplate {
    fn is_skin_type(&self, ty: &SkinType) -> bool {
        self.profile.skin_type == Some(*ty)
    }

    fn concerns_text(&self) -> String {
        self.profile.skin_concerns.join(", ")
    }

    fn interests_text(&self) -> String {
        self.profile.preferences.interests.join(", ")
    }
}

/// Split a comma-separated form field into trimmed, non-empty entries.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

impl ProfileForm {
    /// Validate the form into a profile update.
    fn into_update(self) -> Result<ProfileUpdate> {
        let display_name = self
            .display_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());
        if display_name
            .as_ref()
            .is_some_and(|name| name.chars().count() > MAX_DISPLAY_NAME_LENGTH)
        {
            return Err(AppError::BadRequest(format!(
                "Namnet får vara högst {MAX_DISPLAY_NAME_LENGTH} tecken"
            )));
        }

        let skin_type = match self.skin_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<SkinType>()
                    .map_err(|_| AppError::BadRequest("Okänd hudtyp".to_owned()))?,
            ),
        };

        Ok(ProfileUpdate {
            display_name,
            skin_type,
            skin_concerns: split_list(self.skin_concerns.as_deref()),
            preferences: ProfilePreferences {
                newsletter: self.newsletter.is_some(),
                interests: split_list(self.interests.as_deref()),
            },
        })
    }
}

/// Display the member dashboard.
///
/// Members signed in before their profile row existed get one here.
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse> {
    let profiles = ProfileRepository::new(state.pool());
    let profile = match profiles.get(user.id).await? {
        Some(profile) => profile,
        None => profiles.create_if_absent(user.id, &user.email).await?,
    };

    Ok(DashboardTemplate {
        ctx,
        profile,
        skin_types: SkinType::ALL,
        saved: query.saved.is_some(),
    })
}

/// Save the member's profile and preferences.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let update = form.into_update()?;
    let profile = ProfileRepository::new(state.pool())
        .update(user.id, &update)
        .await?;

    user.display_name = profile.display_name;
    session.insert(session_keys::CURRENT_USER, &user).await?;

    tracing::info!("Profile updated");
    Ok(Redirect::to("/dashboard?saved=1"))
}
