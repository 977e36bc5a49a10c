//! Download link resolution.
//!
//! Maps a principal and a [`DownloadLink`] to the concrete URL to serve.
//! Gated links go through the policy engine; differentiated links are open
//! to every authenticated principal and vary the destination by rank.

use tracing::warn;

use crate::policy::{Denial, Principal, check_access};
use crate::resource::{DownloadLink, RankedUrls};
use crate::tier::Tier;

/// Why a link could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Permission boundary. Final for the same input.
    #[error("access denied: {0}")]
    Denied(Denial),

    /// Content defect: the link has no target reachable for this principal.
    #[error("link {link_id} has no reachable target")]
    Misconfigured { link_id: String },
}

impl From<Denial> for ResolveError {
    fn from(denial: Denial) -> Self {
        Self::Denied(denial)
    }
}

/// Resolve `link` for `principal`.
pub fn resolve<'a>(
    principal: Option<&Principal>,
    link: &'a DownloadLink,
) -> Result<&'a str, ResolveError> {
    let Some(principal) = principal else {
        return Err(ResolveError::Denied(Denial::NotAuthenticated));
    };

    let url = match link.effective_tier().gate() {
        Some(tier) => {
            check_access(Some(principal), tier).into_result()?;
            link.target_url.as_deref()
        }
        None => {
            // Staff select like ultra.
            let rank = principal.role.rank().unwrap_or(Tier::Ultra.rank());
            select_ranked(&link.ranked_urls, rank)
        }
    };

    url.ok_or_else(|| {
        warn!(
            link_id = %link.id,
            game_id = %link.game_id,
            tier = %link.effective_tier(),
            "Download link has no reachable target"
        );
        ResolveError::Misconfigured {
            link_id: link.id.clone(),
        }
    })
}

/// Pick the URL for `rank`, degrading toward lower ranks first.
///
/// When nothing is configured at or below `rank`, the lowest configured rank
/// above it is used.
fn select_ranked(urls: &RankedUrls, rank: u8) -> Option<&str> {
    let top = Tier::Ultra.rank();
    let rank = rank.min(top);
    (0..=rank)
        .rev()
        .find_map(|r| urls.for_rank(r))
        .or_else(|| (rank + 1..=top).find_map(|r| urls.for_rank(r)))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tier::{AccessTier, Role};

    fn gated(tier: AccessTier) -> DownloadLink {
        DownloadLink {
            id: "l1".into(),
            game_id: "g1".into(),
            position: 0,
            label: "Direct".into(),
            access_tier: Some(tier),
            legacy_vip_flag: false,
            target_url: Some("https://dl.example/direct".into()),
            ranked_urls: RankedUrls::default(),
        }
    }

    fn differentiated(member: Option<&str>, plus: Option<&str>, ultra: Option<&str>) -> DownloadLink {
        DownloadLink {
            access_tier: Some(AccessTier::Differentiated),
            target_url: None,
            ranked_urls: RankedUrls {
                member: member.map(Into::into),
                plus: plus.map(Into::into),
                ultra: ultra.map(Into::into),
            },
            ..gated(AccessTier::Free)
        }
    }

    fn user(role: Role) -> Principal {
        Principal::new("u1", role)
    }

    #[test]
    fn anonymous_denied_before_tier_evaluation() {
        for link in [
            gated(AccessTier::Free),
            differentiated(Some("A"), None, None),
            differentiated(None, None, None),
        ] {
            assert_eq!(
                resolve(None, &link),
                Err(ResolveError::Denied(Denial::NotAuthenticated))
            );
        }
    }

    #[test]
    fn free_link_never_denies_authenticated() {
        let link = gated(AccessTier::Free);
        for role in [Role::Member, Role::Plus, Role::Ultra, Role::Support] {
            assert_eq!(
                resolve(Some(&user(role)), &link),
                Ok("https://dl.example/direct")
            );
        }
    }

    #[test]
    fn plus_denied_ultra_link() {
        let link = gated(AccessTier::Ultra);
        assert_eq!(
            resolve(Some(&user(Role::Plus)), &link),
            Err(ResolveError::Denied(Denial::UpgradeRequired(Tier::Ultra)))
        );
    }

    #[test]
    fn legacy_vip_link_gated_at_ultra() {
        let mut link = gated(AccessTier::Free);
        link.access_tier = None;
        link.legacy_vip_flag = true;
        assert_eq!(
            resolve(Some(&user(Role::Member)), &link),
            Err(ResolveError::Denied(Denial::UpgradeRequired(Tier::Ultra)))
        );
        assert!(resolve(Some(&user(Role::Ultra)), &link).is_ok());
    }

    #[test]
    fn gated_link_without_target_is_misconfigured() {
        let mut link = gated(AccessTier::Plus);
        link.target_url = None;
        assert_eq!(
            resolve(Some(&user(Role::Ultra)), &link),
            Err(ResolveError::Misconfigured {
                link_id: "l1".into()
            })
        );
    }

    #[test]
    fn differentiated_selects_by_rank() {
        let link = differentiated(Some("A"), None, Some("C"));
        assert_eq!(resolve(Some(&user(Role::Ultra)), &link), Ok("C"));
        assert_eq!(resolve(Some(&user(Role::Member)), &link), Ok("A"));
        // plus has no URL of its own and degrades to member
        assert_eq!(resolve(Some(&user(Role::Plus)), &link), Ok("A"));
    }

    #[test]
    fn staff_select_like_ultra() {
        let link = differentiated(Some("A"), Some("B"), Some("C"));
        for role in [Role::Support, Role::Moderator, Role::Admin] {
            assert_eq!(resolve(Some(&user(role)), &link), Ok("C"));
        }
    }

    #[test]
    fn ultra_degrades_to_plus_before_member() {
        let link = differentiated(Some("A"), Some("B"), None);
        assert_eq!(resolve(Some(&user(Role::Ultra)), &link), Ok("B"));
    }

    #[test]
    fn only_ultra_url_serves_everyone() {
        let link = differentiated(None, None, Some("C"));
        for role in [Role::Member, Role::Plus, Role::Ultra] {
            assert_eq!(resolve(Some(&user(role)), &link), Ok("C"));
        }
    }

    #[test]
    fn missing_member_url_uses_lowest_configured() {
        let link = differentiated(None, Some("B"), Some("C"));
        assert_eq!(resolve(Some(&user(Role::Member)), &link), Ok("B"));
    }

    #[test]
    fn differentiated_without_urls_is_misconfigured_for_all_roles() {
        let link = differentiated(None, None, None);
        for role in [Role::Member, Role::Plus, Role::Ultra, Role::Admin] {
            assert!(matches!(
                resolve(Some(&user(role)), &link),
                Err(ResolveError::Misconfigured { .. })
            ));
        }
    }
}
