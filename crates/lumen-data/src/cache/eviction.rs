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

use super::item::CacheItem;
use ahash::AHashMap;
use bytemuck::Pod;
use lumen_core::ObjectId;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::mem::size_of;

#[derive(Debug, Clone, Copy)]
struct Resident<T> {
    id: ObjectId,
    version: u32,
    /// Recency stamp. Strictly decreasing from front to back.
    stamp: u64,
    data: T,
}

/// A fixed-capacity LRU cache whose recency order is also its GPU layout.
///
/// Residents are kept most-recently-touched first. The slot an id occupies
/// in the uploaded buffer is its distance from the front, so the slot is
/// only meaningful right after [`map`](Self::map): any later insertion or
/// update shifts positions.
///
/// The capacity is a byte budget. Eviction happens before insertion, so the
/// resident payload never exceeds it, not even transiently.
#[derive(Debug)]
pub struct EvictionCache<T: Pod> {
    residents: VecDeque<Resident<T>>,
    stamps: AHashMap<ObjectId, u64>,
    next_stamp: u64,
    capacity: usize,
    staging: Vec<u8>,
    stale: bool,
}

impl<T: Pod> EvictionCache<T> {
    /// Size of one resident payload in bytes.
    pub const ITEM_SIZE: usize = size_of::<T>();

    /// Creates a cache with a byte budget of `capacity`.
    ///
    /// # Panics
    /// If `T` is zero-sized or `capacity` cannot hold a single item.
    pub fn new(capacity: usize) -> Self {
        assert!(Self::ITEM_SIZE > 0, "cache payload must not be zero-sized");
        assert!(
            capacity >= Self::ITEM_SIZE,
            "capacity of {capacity} bytes cannot hold a {} byte item",
            Self::ITEM_SIZE
        );

        Self {
            residents: VecDeque::with_capacity(capacity / Self::ITEM_SIZE),
            stamps: AHashMap::default(),
            next_stamp: 0,
            capacity,
            staging: vec![0; capacity],
            stale: true,
        }
    }

    /// Creates a cache able to hold `count` items.
    pub fn with_item_capacity(count: usize) -> Self {
        Self::new(count * Self::ITEM_SIZE)
    }

    /// Inserts or refreshes `item` and returns its current slot.
    ///
    /// An id already resident with the same version is left where it is and
    /// its slot is returned. A version mismatch moves the id to the front.
    /// A new id evicts from the back until it fits, then goes to the front.
    /// Both of those mark the buffer stale and return slot 0.
    pub fn add_or_update(&mut self, item: &CacheItem<T>) -> usize {
        let resident = self
            .stamps
            .get(&item.id)
            .and_then(|stamp| self.position_of(*stamp));

        if let Some(position) = resident {
            if self.residents[position].version == item.version() {
                return position;
            }
            self.residents.remove(position);
        } else {
            while self.used_bytes() + Self::ITEM_SIZE > self.capacity {
                match self.residents.pop_back() {
                    Some(evicted) => {
                        log::trace!("Evicting {:?} from cache", evicted.id);
                        self.stamps.remove(&evicted.id);
                    }
                    None => break,
                }
            }
        }

        self.push_front(item);
        self.stale = true;
        0
    }

    /// Returns the slots of the first `limit` ids that are resident.
    ///
    /// Ids that are not resident are skipped, so the output may be shorter
    /// than the input. The cache must have been mapped since its last change.
    pub fn look_up(&self, ids: &[ObjectId], limit: usize) -> Vec<u32> {
        debug_assert!(!self.stale, "look_up on a cache that was not mapped");

        ids.iter()
            .take(limit)
            .filter_map(|id| self.slot_of(*id))
            .map(|slot| slot as u32)
            .collect()
    }

    /// Uploads the residents through `update` if the buffer is stale.
    ///
    /// `update` receives the whole staging buffer, residents packed front to
    /// back and the tail zeroed. Returns whether an upload happened.
    pub fn map<F>(&mut self, update: F) -> bool
    where
        F: FnOnce(&[u8]),
    {
        let mapped: Result<bool, Infallible> = self.try_map(|bytes| {
            update(bytes);
            Ok(())
        });
        matches!(mapped, Ok(true))
    }

    /// Like [`map`](Self::map) with a fallible upload. On error the buffer stays stale.
    pub fn try_map<E, F>(&mut self, update: F) -> Result<bool, E>
    where
        F: FnOnce(&[u8]) -> Result<(), E>,
    {
        if !self.stale {
            return Ok(false);
        }

        self.staging.fill(0);
        for (slot, resident) in self.residents.iter().enumerate() {
            let offset = slot * Self::ITEM_SIZE;
            self.staging[offset..offset + Self::ITEM_SIZE]
                .copy_from_slice(bytemuck::bytes_of(&resident.data));
        }

        update(&self.staging)?;
        log::trace!("Uploaded {} cache residents", self.residents.len());
        self.stale = false;
        Ok(true)
    }

    /// Drops every resident and zeroes the staging buffer.
    pub fn reset(&mut self) {
        self.residents.clear();
        self.stamps.clear();
        self.staging.fill(0);
        self.stale = true;
    }

    /// Slot of `id` if resident.
    pub fn slot_of(&self, id: ObjectId) -> Option<usize> {
        self.stamps
            .get(&id)
            .and_then(|stamp| self.position_of(*stamp))
    }

    /// Returns `true` if `id` is resident.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.stamps.contains_key(&id)
    }

    /// Resident ids, front (slot 0) to back.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.residents.iter().map(|r| r.id)
    }

    /// Number of residents.
    pub fn len(&self) -> usize {
        self.residents.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.residents.is_empty()
    }

    /// Bytes occupied by residents.
    pub fn used_bytes(&self) -> usize {
        self.residents.len() * Self::ITEM_SIZE
    }

    /// Byte budget.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity
    }

    /// Number of items that fit in the byte budget.
    pub fn item_capacity(&self) -> usize {
        self.capacity / Self::ITEM_SIZE
    }

    /// Returns `true` if the GPU copy is out of date.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    fn push_front(&mut self, item: &CacheItem<T>) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.residents.push_front(Resident {
            id: item.id,
            version: item.version(),
            stamp,
            data: item.data,
        });
        self.stamps.insert(item.id, stamp);
    }

    fn position_of(&self, stamp: u64) -> Option<usize> {
        // Stamps decrease toward the back.
        self.residents
            .binary_search_by(|resident| stamp.cmp(&resident.stamp))
            .ok()
    }
}
