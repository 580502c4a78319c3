use std::sync::{Arc, RwLock};

use tracing::debug;

use super::domain::{Position, PositionId};
use super::store::{PositionDirectory, StoreError};

/// Session-scoped "active position" shared by every screen.
///
/// Clones share the same slot. Changing the selection does not refresh anything; each
/// screen re-queries when it observes the change.
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    position: Arc<RwLock<Option<PositionId>>>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(position: PositionId) -> Self {
        let context = Self::new();
        context.set(Some(position));
        context
    }

    pub fn get(&self) -> Option<PositionId> {
        match self.position.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, position: Option<PositionId>) {
        debug!(position = ?position, "position selection changed");
        let mut guard = match self.position.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = position;
    }

    pub fn clear(&self) {
        self.set(None);
    }
}

/// Positions a reviewer may pick from, in directory order.
pub async fn choices(directory: &dyn PositionDirectory) -> Result<Vec<Position>, StoreError> {
    directory.positions().await
}
