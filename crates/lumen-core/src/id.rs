// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persistent object identity used to key GPU-side caches.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(1);

/// A persistent identifier for an object whose data is mirrored on the GPU.
///
/// Cache items, shaders and programs are all keyed by `ObjectId`. Scene
/// objects derive theirs from their arena key, so a recycled arena slot
/// yields a different id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// The id reserved for "no object".
    pub const NULL: Self = Self(0);

    /// Returns a fresh id that has never been handed out by this process.
    pub fn unique() -> Self {
        Self(NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns `true` if this is the reserved null id.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
