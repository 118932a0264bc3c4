//! Profile filename classification.
//!
//! Grammar: `<capture>_<businessProcess>_<sourcingActor>_<modelPart>_<version>.zip`
//! where the business process may be empty for EQ profiles only
//! (`20191106T0930Z__XX_EQ_001.zip`).

use super::types::{AuthorizationSets, ModelPart, ProfileFilename};

const PROFILE_EXTENSION: &str = "zip";
const SEGMENT_COUNT: usize = 5;

/// Model part of a valid profile filename, `None` when the name is rejected.
pub fn classify(name: &str, authz: &AuthorizationSets) -> Option<ModelPart> {
    parse_profile_filename(name, authz).map(|p| p.model_part)
}

/// Parse and validate a profile filename against the authorization sets.
pub fn parse_profile_filename(name: &str, authz: &AuthorizationSets) -> Option<ProfileFilename> {
    let (stem, extension) = name.split_once('.')?;
    if extension != PROFILE_EXTENSION {
        return None;
    }

    let segments: Vec<&str> = stem.split('_').collect();
    if segments.len() != SEGMENT_COUNT {
        return None;
    }
    let (capture_time, business_process, actor, part, version) =
        (segments[0], segments[1], segments[2], segments[3], segments[4]);

    let model_part = ModelPart::from_str(part)?;
    if !authz.is_authorized_actor(actor) {
        return None;
    }
    if !is_valid_business_process(business_process, model_part, authz) {
        return None;
    }
    let version = parse_version(version)?;

    Some(ProfileFilename {
        capture_time: capture_time.to_string(),
        business_process: business_process.to_string(),
        sourcing_actor: actor.to_string(),
        model_part,
        version,
    })
}

fn is_valid_business_process(
    business_process: &str,
    model_part: ModelPart,
    authz: &AuthorizationSets,
) -> bool {
    if business_process.is_empty() {
        return model_part == ModelPart::Eq;
    }
    authz.is_authorized_business_process(business_process)
}

/// Exactly three ASCII digits, value in `[1, 999]`.
fn parse_version(raw: &str) -> Option<u16> {
    if raw.len() != 3 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let version: u16 = raw.parse().ok()?;
    (1..=999).contains(&version).then_some(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authz() -> AuthorizationSets {
        AuthorizationSets::new(["XX"], ["1D"])
    }

    #[test]
    fn valid_ssh_profile() {
        assert_eq!(
            classify("20191106T0930Z_1D_XX_SSH_001.zip", &authz()),
            Some(ModelPart::Ssh)
        );
    }

    #[test]
    fn rejects_malformed_names() {
        let authz = authz();
        for name in [
            "20191106T0930Z_1D_XX_SSH_1002.zip",
            "20191106T0930Z_1D_YY_SSH_001.zip",
            "20191106T0930Z_6D_XX_SSH_001.zip",
            "20191106T0930Z_1D_XX_SSH_001.xml",
            "20191106T0930Z_1D_XX_SSH_abc.zip",
        ] {
            assert_eq!(classify(name, &authz), None, "{name} should be rejected");
        }
    }

    #[test]
    fn empty_business_process_only_for_eq() {
        let authz = authz();
        assert_eq!(
            classify("20191106T0930Z__XX_EQ_001.zip", &authz),
            Some(ModelPart::Eq)
        );
        assert_eq!(classify("20191106T0930Z__XX_SSH_001.zip", &authz), None);
    }

    #[test]
    fn version_bounds() {
        let authz = authz();
        assert_eq!(classify("20191106T0930Z_1D_XX_TP_000.zip", &authz), None);
        assert_eq!(
            classify("20191106T0930Z_1D_XX_TP_999.zip", &authz),
            Some(ModelPart::Tp)
        );
        assert_eq!(classify("20191106T0930Z_1D_XX_TP_+01.zip", &authz), None);
        assert_eq!(classify("20191106T0930Z_1D_XX_TP_01.zip", &authz), None);
    }

    #[test]
    fn rejects_wrong_structure() {
        let authz = authz();
        assert_eq!(classify("20191106T0930Z_1D_XX_SV_001.tar.zip", &authz), None);
        assert_eq!(classify("20191106T0930Z_1D_XX_SV_001", &authz), None);
        assert_eq!(classify("20191106T0930Z_1D_XX_SV_001_extra.zip", &authz), None);
        assert_eq!(classify("1D_XX_SV_001.zip", &authz), None);
        assert_eq!(classify("20191106T0930Z_1D_XX_DL_001.zip", &authz), None);
        assert_eq!(classify("20191106T0930Z_1D_XX_sv_001.zip", &authz), None);
    }

    #[test]
    fn classification_is_deterministic() {
        let authz = authz();
        let name = "20191106T0930Z_1D_XX_SV_001.zip";
        let first = classify(name, &authz);
        assert_eq!(first, Some(ModelPart::Sv));
        assert_eq!(classify(name, &authz), first);
    }

    #[test]
    fn parse_exposes_all_fields() {
        let parsed = parse_profile_filename("20191106T0930Z_1D_XX_SV_042.zip", &authz()).unwrap();
        assert_eq!(parsed.capture_time, "20191106T0930Z");
        assert_eq!(parsed.business_process, "1D");
        assert_eq!(parsed.sourcing_actor, "XX");
        assert_eq!(parsed.model_part, ModelPart::Sv);
        assert_eq!(parsed.version, 42);
        assert!(parsed.is_composite_trigger());
        assert_eq!(parsed.assembled_name(), "20191106T0930Z_1D_XX_042.zip");
    }

    #[test]
    fn empty_authorization_rejects_everything() {
        let empty = AuthorizationSets::default();
        assert_eq!(classify("20191106T0930Z__XX_EQ_001.zip", &empty), None);
    }
}
