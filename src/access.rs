//! Role-based page access.
//!
//! One table maps each role to its home and the sections it may enter.
//! Anything outside the role sections, and every `/api` path, is public.

use std::sync::LazyLock;

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use regex::Regex;

use crate::auth::MaybeIdentity;
use crate::error::ApiError;
use crate::models::Role;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";

struct RoleRule {
    role: Role,
    home: &'static str,
    allowed: Regex,
}

static PROTECTED: LazyLock<Regex> = LazyLock::new(|| section("admin|guru|murid|awam"));

static RULES: LazyLock<Vec<RoleRule>> = LazyLock::new(|| {
    vec![
        RoleRule {
            role: Role::Admin,
            home: "/admin",
            allowed: section("admin|guru|murid|awam"),
        },
        RoleRule {
            role: Role::Guru,
            home: "/guru",
            allowed: section("guru"),
        },
        RoleRule {
            role: Role::Murid,
            home: "/murid",
            allowed: section("murid"),
        },
        RoleRule {
            role: Role::Awam,
            home: "/awam",
            allowed: section("awam"),
        },
    ]
});

// Section names are literals, so the pattern always compiles.
fn section(names: &str) -> Regex {
    Regex::new(&format!("^/({names})(/|$)")).expect("static section pattern")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

pub fn home_for(role: Role) -> &'static str {
    RULES
        .iter()
        .find(|rule| rule.role == role)
        .map_or(LOGIN_PATH, |rule| rule.home)
}

/// `role` is `None` for an anonymous visitor.
pub fn decide(role: Option<Role>, path: &str) -> Access {
    if !PROTECTED.is_match(path) {
        return Access::Allow;
    }
    let Some(role) = role else {
        return Access::Redirect(LOGIN_PATH);
    };
    match RULES.iter().find(|rule| rule.role == role) {
        Some(rule) if rule.allowed.is_match(path) => Access::Allow,
        _ => Access::Redirect(home_for(role)),
    }
}

pub async fn role_redirect(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if path.starts_with("/api") || !PROTECTED.is_match(&path) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let requester = match MaybeIdentity::from_request_parts(&mut parts, &state).await {
        Ok(requester) => requester,
        Err(e) => return e.into_response(),
    };
    let request = Request::from_parts(parts, body);

    let role = match requester.0 {
        None => None,
        Some(identity) => match state.backend.get_profile(identity.id).await {
            Ok(profile) => Some(profile.map_or(Role::Awam, |p| p.role)),
            Err(e) => return ApiError::internal("Failed to load profile", e).into_response(),
        },
    };

    match decide(role, &path) {
        Access::Allow => next.run(request).await,
        Access::Redirect(target) => {
            tracing::debug!(%path, target, "redirecting page visit");
            Redirect::temporary(target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_are_open_to_everyone() {
        for path in ["/", "/login", "/leaderboard", "/administrator", "/guruan"] {
            assert_eq!(decide(None, path), Access::Allow, "{path}");
        }
    }

    #[test]
    fn anonymous_visitors_go_to_login() {
        assert_eq!(decide(None, "/murid/nota"), Access::Redirect(LOGIN_PATH));
        assert_eq!(decide(None, "/admin"), Access::Redirect(LOGIN_PATH));
    }

    #[test]
    fn roles_stay_in_their_sections() {
        assert_eq!(decide(Some(Role::Murid), "/murid/nota/1"), Access::Allow);
        assert_eq!(decide(Some(Role::Murid), "/guru"), Access::Redirect("/murid"));
        assert_eq!(decide(Some(Role::Guru), "/admin/users"), Access::Redirect("/guru"));
        assert_eq!(decide(Some(Role::Awam), "/murid"), Access::Redirect("/awam"));
    }

    #[test]
    fn admin_may_visit_every_section() {
        for path in ["/admin", "/guru/kelas", "/murid", "/awam/x"] {
            assert_eq!(decide(Some(Role::Admin), path), Access::Allow, "{path}");
        }
    }

    #[test]
    fn every_role_has_a_home() {
        assert_eq!(home_for(Role::Admin), "/admin");
        assert_eq!(home_for(Role::Guru), "/guru");
        assert_eq!(home_for(Role::Murid), "/murid");
        assert_eq!(home_for(Role::Awam), "/awam");
    }
}
