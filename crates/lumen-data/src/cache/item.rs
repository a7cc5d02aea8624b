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

use lumen_core::ObjectId;

/// A GPU-uploadable payload tagged with the identity and version of its owner.
///
/// The owner invalidates the item whenever a source field changes and
/// re-packs `data` before the next upload; [`validate`](Self::validate) then
/// bumps the version so caches holding the old copy see a mismatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheItem<T> {
    /// Persistent id of the owning object.
    pub id: ObjectId,
    version: u32,
    is_valid: bool,
    /// Payload laid out for direct upload.
    pub data: T,
}

impl<T> CacheItem<T> {
    /// Creates an invalid item at version zero.
    pub fn new(id: ObjectId, data: T) -> Self {
        Self {
            id,
            version: 0,
            is_valid: false,
            data,
        }
    }

    /// Marks the payload as current and bumps the version.
    pub fn validate(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.is_valid = true;
    }

    /// Marks the payload as outdated. The version is kept.
    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    /// Current version, bumped by every `validate`.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns `false` from `invalidate` until the next `validate`.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Returns an item with the same identity and version carrying `data`.
    pub fn with_data<U>(&self, data: U) -> CacheItem<U> {
        CacheItem {
            id: self.id,
            version: self.version,
            is_valid: self.is_valid,
            data,
        }
    }
}
