//! Exclusion Filter - Objects a dump must not emit or enter
//!
//! Container membership is decided by the runtime's equality, not identity:
//! two distinct but equal text values are both excluded when one of them is
//! in the container. This imprecision is deliberate and kept.

use crate::object::{ObjectHandle, ObjectModel};

/// Caller-owned exclusion filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExclusionFilter {
    /// Dump everything
    #[default]
    None,
    /// Skip exactly this object
    Object(ObjectHandle),
    /// Skip the container itself and every object it reports as a member
    Container(ObjectHandle),
}

impl ExclusionFilter {
    /// Whether `obj` must be skipped
    ///
    /// Membership errors (unhashable probes, unsupported containers) count as
    /// "not excluded".
    pub fn excludes(&self, model: &dyn ObjectModel, obj: ObjectHandle) -> bool {
        match *self {
            ExclusionFilter::None => false,
            ExclusionFilter::Object(sentinel) => sentinel == obj,
            ExclusionFilter::Container(container) => {
                if container == obj {
                    return true;
                }
                match model.contains(container, obj) {
                    Ok(found) => found,
                    Err(err) => {
                        log::trace!("membership probe for {} ignored: {}", obj, err);
                        false
                    }
                }
            }
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self, ExclusionFilter::None)
    }
}
