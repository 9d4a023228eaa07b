// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Listing options and results, and their translation to backend pages.

use super::client::Storage;
use super::location::ObjectLocation;
use super::native::{ListRequest, ListResponse};
use super::reference::Reference;
use crate::error::{Error, Result};

/// Page size used when aggregating a full listing.
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 1000;

/// Options for one page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Page size, between 1 and 1000. The backend picks when unset.
    pub max_results: Option<u32>,
    /// Continuation token from a previous page, passed back unmodified.
    pub page_token: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.max_results {
            Some(n) if !(1..=DEFAULT_LIST_PAGE_SIZE).contains(&n) => {
                Err(Error::InvalidArgument(format!(
                    "max_results must be between 1 and {}, got {}",
                    DEFAULT_LIST_PAGE_SIZE, n
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Child objects and prefixes of a reference.
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    pub items: Vec<Reference>,
    pub prefixes: Vec<Reference>,
    /// Present when more results are available.
    pub next_page_token: Option<String>,
}

pub fn to_list_request(options: &ListOptions) -> ListRequest {
    ListRequest {
        max_results: options.max_results,
        page_token: options.page_token.clone(),
        ..Default::default()
    }
}

/// Wrap every child of a backend page as a reference on the same storage root.
pub fn from_list_response(
    storage: &Storage,
    parent: &ObjectLocation,
    response: ListResponse,
) -> ListResult {
    let prefixes = response
        .prefixes
        .iter()
        .map(|prefix| {
            Reference::from_location(
                storage.clone(),
                ObjectLocation::new(parent.bucket(), prefix),
            )
        })
        .collect();

    let items = response
        .items
        .into_iter()
        .map(|item| {
            Reference::from_location(storage.clone(), ObjectLocation::new(item.bucket, &item.name))
        })
        .collect();

    ListResult {
        items,
        prefixes,
        next_page_token: response.next_page_token,
    }
}
