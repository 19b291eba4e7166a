//! Shareable per-guest invite links.

use url::Url;

use crate::error::{PlannerError, PlannerResult};
use crate::model::GuestId;

/// `{base}/invite/{guest_id}`, keeping any path already on `base`.
pub fn invite_link(base: &Url, guest_id: &GuestId) -> PlannerResult<Url> {
    let mut link = base.clone();
    link.set_query(None);
    link.set_fragment(None);
    link.path_segments_mut()
        .map_err(|_| PlannerError::Config(format!("Invite base URL '{}' cannot have paths", base)))?
        .pop_if_empty()
        .push("invite")
        .push(guest_id.as_str());
    Ok(link)
}
