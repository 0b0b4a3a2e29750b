//! Attachment link resolution against the chat server.

use tracing::warn;
use url::Url;

const USER_ID_PARAM: &str = "rc_uid";
const TOKEN_PARAM: &str = "rc_token";

/// Resolve an attachment link to an absolute, authenticated URL.
///
/// Relative links are joined onto `base_url`. Links that already carry a
/// token are returned as given. Returns `None` when there is no link or it
/// cannot be parsed.
pub fn resolve_attachment_url(
    link: Option<&str>,
    user_id: &str,
    token: &str,
    base_url: &str,
) -> Option<String> {
    let link = link.map(str::trim).filter(|link| !link.is_empty())?;

    let absolute = if link.starts_with("http") {
        if link.contains(TOKEN_PARAM) {
            return Some(link.to_owned());
        }
        link.to_owned()
    } else {
        format!("{}{link}", base_url.trim_end_matches('/'))
    };

    let mut url = match Url::parse(&absolute) {
        Ok(url) => url,
        Err(err) => {
            warn!(link, error = %err, "unparseable attachment link");
            return None;
        }
    };
    url.query_pairs_mut()
        .append_pair(USER_ID_PARAM, user_id)
        .append_pair(TOKEN_PARAM, token);
    Some(url.to_string())
}
