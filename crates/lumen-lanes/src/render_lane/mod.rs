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

//! Rendering lane: build, classify, sort and submit render jobs.

mod assign;
mod builder;
mod classify;
mod context;
mod error;
mod job;
mod program;
mod renderer;
mod sort;
mod stats;

pub use assign::*;
pub use builder::*;
pub use classify::*;
pub use context::*;
pub use error::*;
pub use job::*;
pub use program::*;
pub use renderer::*;
pub use sort::*;
pub use stats::*;
