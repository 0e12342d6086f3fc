//! Tag presence events

use crate::ident::TagIdentifiers;
use serde::{Deserialize, Serialize};

/// Event delivered by [`crate::NfcHandler::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagEvent {
    /// A tag was read
    Present(TagIdentifiers),
    /// The previously present tag left the field
    Absent,
}

impl TagEvent {
    pub fn identifiers(&self) -> Option<TagIdentifiers> {
        match self {
            TagEvent::Present(ids) => Some(*ids),
            TagEvent::Absent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = TagEvent::Present(TagIdentifiers::new(3, 7));
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "present");
        assert_eq!(json["spool_id"], 3);
        assert_eq!(json["filament_id"], 7);

        let json = serde_json::to_value(TagEvent::Absent).unwrap();
        assert_eq!(json["type"], "absent");
    }
}
