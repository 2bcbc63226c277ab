use std::fmt;
use std::time::Duration as StdDuration;

use const_oid::ObjectIdentifier;
use der::asn1::{
    GeneralizedTime, Ia5StringRef, OctetString, PrintableStringRef, SetOfVec, UtcTime,
    Utf8StringRef,
};
use der::{Any, Tag, Tagged};
use time::{Duration, OffsetDateTime};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::time::Time;

use super::extensions::ToAndFromX509Extension;
use crate::error::{PqCertKitError, Result};

/// Seconds in one validity day.
pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StringKind {
    Utf8,
    Printable,
    Ia5,
}

struct AttributeInfo {
    short: &'static str,
    long: &'static str,
    oid: ObjectIdentifier,
    kind: StringKind,
}

const fn attr(
    short: &'static str,
    long: &'static str,
    oid: &'static str,
    kind: StringKind,
) -> AttributeInfo {
    AttributeInfo {
        short,
        long,
        oid: ObjectIdentifier::new_unwrap(oid),
        kind,
    }
}

// String types follow OpenSSL's default `utf8only` mask.
const ATTRIBUTES: &[AttributeInfo] = &[
    attr("CN", "commonName", "2.5.4.3", StringKind::Utf8),
    attr("SN", "surname", "2.5.4.4", StringKind::Utf8),
    attr("serialNumber", "serialNumber", "2.5.4.5", StringKind::Printable),
    attr("C", "countryName", "2.5.4.6", StringKind::Printable),
    attr("L", "localityName", "2.5.4.7", StringKind::Utf8),
    attr("ST", "stateOrProvinceName", "2.5.4.8", StringKind::Utf8),
    attr("street", "streetAddress", "2.5.4.9", StringKind::Utf8),
    attr("O", "organizationName", "2.5.4.10", StringKind::Utf8),
    attr("OU", "organizationalUnitName", "2.5.4.11", StringKind::Utf8),
    attr("title", "title", "2.5.4.12", StringKind::Utf8),
    attr("postalCode", "postalCode", "2.5.4.17", StringKind::Utf8),
    attr("GN", "givenName", "2.5.4.42", StringKind::Utf8),
    attr("initials", "initials", "2.5.4.43", StringKind::Utf8),
    attr("dnQualifier", "dnQualifier", "2.5.4.46", StringKind::Printable),
    attr("pseudonym", "pseudonym", "2.5.4.65", StringKind::Utf8),
    attr("emailAddress", "emailAddress", "1.2.840.113549.1.9.1", StringKind::Ia5),
    attr("UID", "userId", "0.9.2342.19200300.100.1.1", StringKind::Utf8),
    attr("DC", "domainComponent", "0.9.2342.19200300.100.1.25", StringKind::Ia5),
];

const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");

fn lookup_by_name(name: &str) -> Option<&'static AttributeInfo> {
    ATTRIBUTES
        .iter()
        .find(|a| a.short.eq_ignore_ascii_case(name) || a.long.eq_ignore_ascii_case(name))
}

fn lookup_by_oid(oid: &ObjectIdentifier) -> Option<&'static AttributeInfo> {
    ATTRIBUTES.iter().find(|a| a.oid == *oid)
}

/// One `type=value` pair of a distinguished name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectAttribute {
    pub attribute_type: String,
    pub value: String,
}

impl SubjectAttribute {
    fn to_x509_attribute(&self) -> Result<AttributeTypeAndValue> {
        let (oid, kind) = match lookup_by_name(&self.attribute_type) {
            Some(info) => (info.oid, info.kind),
            None => {
                let oid = ObjectIdentifier::new(&self.attribute_type).map_err(|_| {
                    PqCertKitError::EncodingError(format!(
                        "unknown subject attribute type {:?}",
                        self.attribute_type
                    ))
                })?;
                (oid, lookup_by_oid(&oid).map_or(StringKind::Utf8, |i| i.kind))
            }
        };

        let invalid = |e: der::Error| {
            PqCertKitError::EncodingError(format!(
                "{}={:?} cannot be encoded: {e}",
                self.attribute_type, self.value
            ))
        };
        let value = match kind {
            StringKind::Utf8 => {
                Any::encode_from(&Utf8StringRef::new(&self.value).map_err(invalid)?)
            }
            StringKind::Printable => {
                if oid == COUNTRY_NAME && self.value.len() != 2 {
                    return Err(PqCertKitError::EncodingError(format!(
                        "country code must be two characters, got {:?}",
                        self.value
                    )));
                }
                Any::encode_from(&PrintableStringRef::new(&self.value).map_err(invalid)?)
            }
            StringKind::Ia5 => Any::encode_from(&Ia5StringRef::new(&self.value).map_err(invalid)?),
        }
        .map_err(invalid)?;

        Ok(AttributeTypeAndValue { oid, value })
    }

    fn from_x509_attribute(atv: &AttributeTypeAndValue) -> Self {
        let attribute_type = lookup_by_oid(&atv.oid)
            .map(|info| info.short.to_string())
            .unwrap_or_else(|| atv.oid.to_string());
        let value = match atv.value.tag() {
            Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
                String::from_utf8_lossy(atv.value.value()).into_owned()
            }
            _ => atv
                .value
                .value()
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect(),
        };
        Self {
            attribute_type,
            value,
        }
    }
}

/// An ordered distinguished name.
///
/// Built from `key=value` entries with [`parse_subject`]. Encoding order is
/// entry order, one RDN per entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubjectName {
    attributes: Vec<SubjectAttribute>,
}

impl SubjectName {
    /// Parses `key=value` entries, keeping their order.
    ///
    /// Each entry is split at its first `=`, so values may themselves contain
    /// `=`. Fails on the first entry with an empty key or value.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let attributes = entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref();
                match entry.split_once('=') {
                    Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                        Ok(SubjectAttribute {
                            attribute_type: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                    _ => Err(PqCertKitError::MalformedSubjectEntry(entry.to_string())),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[SubjectAttribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns the first value of the given attribute type.
    pub fn get(&self, attribute_type: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type.eq_ignore_ascii_case(attribute_type))
            .map(|a| a.value.as_str())
    }

    /// Converts the name to an X.509 `Name`.
    pub fn as_x509_name(&self) -> Result<Name> {
        let rdns = self
            .attributes
            .iter()
            .map(|a| {
                let set = SetOfVec::try_from(vec![a.to_x509_attribute()?])?;
                Ok(RelativeDistinguishedName(set))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RdnSequence(rdns))
    }

    /// Creates a `SubjectName` from an X.509 `Name`.
    ///
    /// Multi-valued RDNs are flattened in encoding order.
    pub fn from_x509_name(name: &Name) -> Self {
        let attributes = name
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .map(SubjectAttribute::from_x509_attribute)
            .collect();
        Self { attributes }
    }
}

impl fmt::Display for SubjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", a.attribute_type, a.value)?;
        }
        Ok(())
    }
}

/// Parses ordered `key=value` subject entries.
pub fn parse_subject<S: AsRef<str>>(entries: &[S]) -> Result<SubjectName> {
    SubjectName::parse(entries)
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period of `days` whole days starting at `now`.
    ///
    /// `now` is truncated to whole seconds, the resolution of X.509 times.
    pub fn starting_at(now: OffsetDateTime, days: u32) -> Result<Self> {
        let not_before = OffsetDateTime::from_unix_timestamp(now.unix_timestamp())
            .map_err(|e| PqCertKitError::InvalidInput(e.to_string()))?;
        let not_after = not_before
            .checked_add(Duration::seconds(i64::from(days) * SECONDS_PER_DAY))
            .ok_or_else(|| {
                PqCertKitError::InvalidInput(format!("validity of {days} days overflows"))
            })?;
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// Length of the period in seconds.
    pub fn seconds(&self) -> i64 {
        (self.not_after - self.not_before).whole_seconds()
    }

    /// True when `at` lies within the period, bounds included.
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    pub fn to_x509_validity(&self) -> Result<x509_cert::time::Validity> {
        Ok(x509_cert::time::Validity {
            not_before: x509_time(self.not_before)?,
            not_after: x509_time(self.not_after)?,
        })
    }

    pub fn from_x509_validity(validity: &x509_cert::time::Validity) -> Result<Self> {
        Ok(Self {
            not_before: offset_date_time(&validity.not_before)?,
            not_after: offset_date_time(&validity.not_after)?,
        })
    }
}

/// Encodes a timestamp as UTCTime through 2049 and GeneralizedTime after.
pub(crate) fn x509_time(at: OffsetDateTime) -> Result<Time> {
    let secs = u64::try_from(at.unix_timestamp()).map_err(|_| {
        PqCertKitError::EncodingError(format!("{at} predates the Unix epoch"))
    })?;
    let since_epoch = StdDuration::from_secs(secs);
    match UtcTime::from_unix_duration(since_epoch) {
        Ok(utc) => Ok(Time::UtcTime(utc)),
        Err(_) => Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(
            since_epoch,
        )?)),
    }
}

/// Reads an X.509 time back as an `OffsetDateTime`.
pub(crate) fn offset_date_time(at: &Time) -> Result<OffsetDateTime> {
    let secs = i64::try_from(at.to_unix_duration().as_secs())
        .map_err(|e| PqCertKitError::CertificateParseError(e.to_string()))?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| PqCertKitError::CertificateParseError(e.to_string()))
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }

    pub fn from_x509_extension(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }

    pub fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())?,
        })
    }
}
