/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Boundary decoding: raw requests, typed extras, scheme and URL extraction.

pub mod extras;
pub mod request;
pub mod scheme;
pub mod url_extract;

pub use extras::{ExtraValue, RequestExtras};
pub use request::{Action, ActivationRequest, LaunchFlags, RawActivationRequest, RequestMetadata};
pub use scheme::{SchemeFamily, SchemeRegistry, sanitize_scheme};
pub use url_extract::{UrlExtraction, UrlExtractor, extract_url};
