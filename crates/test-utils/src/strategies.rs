//! Proptest strategies for FindItNow domain types.
//!
//! Strategies produce values that pass boundary validation while exploring
//! edge cases through random variation.
//!
//! # Usage
//!
//! ```no_run
//! use finditnow_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(code in strategies::arb_code()) {
//!         // test invariant with a randomly generated access code
//!     }
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use finditnow_types::{AccessCode, CodeState, SetCondition, UploadRequest};
use proptest::prelude::*;

/// Generates an access code of 1-64 characters matching `[A-Za-z0-9_-]`.
pub fn arb_code() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,64}"
}

/// Generates a code with surrounding whitespace that trims to a valid code.
pub fn arb_padded_code() -> impl Strategy<Value = (String, String)> {
    ("[ \t]{0,3}", arb_code(), "[ \t\n]{0,3}")
        .prop_map(|(lead, code, trail)| (format!("{lead}{code}{trail}"), code))
}

/// Generates an allowed image extension in mixed case.
pub fn arb_extension() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["jpg", "jpeg", "png", "JPG", "Png"]).prop_map(str::to_string)
}

/// Generates a catalog name stem of 1-40 characters, starting alphanumeric.
pub fn arb_name_stem() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 !'()_-]{0,39}"
}

/// Generates a complete, valid catalog entry name such as `lost cat(2).jpg`.
pub fn arb_item_name() -> impl Strategy<Value = String> {
    (arb_name_stem(), arb_extension()).prop_map(|(stem, ext)| format!("{stem}.{ext}"))
}

/// Generates 1-255 bytes of image payload.
pub fn arb_image_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 1..256)
}

/// Generates a valid [`UploadRequest`] whose media type matches its extension.
pub fn arb_upload_request() -> impl Strategy<Value = UploadRequest> {
    (arb_name_stem(), arb_extension(), arb_image_bytes()).prop_map(|(stem, ext, content)| {
        let media_type =
            if ext.eq_ignore_ascii_case("png") { "image/png" } else { "image/jpeg" };
        UploadRequest::new(format!("{stem}.{ext}"), content, media_type)
    })
}

/// Generates an arbitrary [`SetCondition`].
pub fn arb_set_condition() -> impl Strategy<Value = SetCondition> {
    prop_oneof![
        Just(SetCondition::MustNotExist),
        Just(SetCondition::StateEquals(CodeState::Live)),
        Just(SetCondition::StateEquals(CodeState::Spent)),
    ]
}

/// Generates a UTC timestamp within a realistic range (2020-2030).
pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (1_577_836_800i64..1_893_456_000i64)
        .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
}

/// Generates an [`AccessCode`] record, live or spent.
pub fn arb_access_code() -> impl Strategy<Value = AccessCode> {
    (arb_code(), arb_timestamp(), any::<bool>()).prop_map(|(code, issued_at, spent)| {
        let record = AccessCode::issue(code, issued_at);
        if spent { record.spent(issued_at + chrono::Duration::minutes(5)) } else { record }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use finditnow_types::{
        config::{CatalogConfig, ValidationConfig},
        validation,
    };

    use super::*;

    proptest! {
        #[test]
        fn generated_codes_pass_validation(code in arb_code()) {
            prop_assert!(validation::normalize_code(&code, &ValidationConfig::default()).is_ok());
        }

        #[test]
        fn padded_codes_trim_to_inner_code((padded, code) in arb_padded_code()) {
            let normalized = validation::normalize_code(&padded, &ValidationConfig::default());
            prop_assert_eq!(normalized.unwrap(), code.as_str());
        }

        #[test]
        fn generated_names_pass_validation(name in arb_item_name()) {
            prop_assert!(validation::validate_item_name(&name, &ValidationConfig::default()).is_ok());
            prop_assert!(validation::validate_extension(&name, &CatalogConfig::default()).is_ok());
        }

        #[test]
        fn generated_uploads_have_consistent_media_types(request in arb_upload_request()) {
            let ext = validation::validate_extension(&request.name, &CatalogConfig::default()).unwrap();
            let media_type = request.media_type.as_deref().unwrap();
            prop_assert!(validation::validate_media_type(media_type, ext).is_ok());
        }

        #[test]
        fn spent_records_carry_used_at(record in arb_access_code()) {
            prop_assert_eq!(record.is_used, record.used_at.is_some());
        }
    }
}
