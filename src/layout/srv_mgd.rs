//! Server-managed predicate and type catalogue.
//!
//! Fixes which predicates and `rdf:type` values a client may never set
//! directly — they are computed and written by the repository itself.
//! Mirrors the fixed catalogue the original Fedora4/LDP implementation
//! this model is based on carries as a static dictionary, rather than a
//! configurable list.

/// Predicates the repository computes; rejected in client-provided
/// triples on create/replace/update (enforced by [`crate::model`]).
pub const SERVER_MANAGED_PREDICATES: &[&str] = &[
    "http://fedora.info/definitions/v4/repository#created",
    "http://fedora.info/definitions/v4/repository#createdBy",
    "http://fedora.info/definitions/v4/repository#lastModified",
    "http://fedora.info/definitions/v4/repository#lastModifiedBy",
    "http://fedora.info/definitions/v4/repository#hasParent",
    "http://www.loc.gov/premis/rdf/v1#hasSize",
    "http://www.loc.gov/premis/rdf/v1#hasMessageDigest",
    "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#hasMimeType",
    "http://fedora.info/definitions/v4/repository#hasVersion",
    "http://fedora.info/definitions/v4/repository#hasVersions",
    "http://www.w3.org/ns/ldp#contains",
    "http://fedora.info/definitions/v4/system#buried",
    "http://fedora.info/definitions/v4/system#tombstone",
];

/// `rdf:type` values the repository computes; rejected in client-provided
/// triples except where noted in [`EXEMPT_ON_CREATE`].
pub const SERVER_MANAGED_TYPES: &[&str] = &[
    "http://fedora.info/definitions/v4/repository#Binary",
    "http://fedora.info/definitions/v4/repository#Container",
    "http://fedora.info/definitions/v4/system#Tombstone",
    "http://www.w3.org/ns/ldp#Resource",
    "http://www.w3.org/ns/ldp#RDFSource",
    "http://www.w3.org/ns/ldp#NonRDFSource",
    "http://www.w3.org/ns/ldp#Container",
    "http://www.w3.org/ns/ldp#BasicContainer",
    "http://fedora.info/definitions/v4/system#Pairtree",
];

/// `rdf:type` values a client may legitimately declare on create, to
/// request non-default container behavior.
pub const EXEMPT_ON_CREATE: &[&str] = &[
    "http://www.w3.org/ns/ldp#DirectContainer",
    "http://www.w3.org/ns/ldp#IndirectContainer",
];

pub const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
pub const FCREPO_HAS_PARENT: &str = "http://fedora.info/definitions/v4/repository#hasParent";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const LDP_RESOURCE: &str = "http://www.w3.org/ns/ldp#Resource";
pub const LDP_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#RDFSource";
pub const LDP_NON_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#NonRDFSource";
pub const LDP_CONTAINER: &str = "http://www.w3.org/ns/ldp#Container";
pub const LDP_BASIC_CONTAINER: &str = "http://www.w3.org/ns/ldp#BasicContainer";
pub const LDP_DIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#DirectContainer";
pub const LDP_INDIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#IndirectContainer";
pub const LDP_MEMBERSHIP_RESOURCE: &str = "http://www.w3.org/ns/ldp#membershipResource";
pub const LDP_HAS_MEMBER_RELATION: &str = "http://www.w3.org/ns/ldp#hasMemberRelation";
pub const LDP_INSERTED_CONTENT_RELATION: &str = "http://www.w3.org/ns/ldp#insertedContentRelation";

pub const FCREPO_BINARY: &str = "http://fedora.info/definitions/v4/repository#Binary";
pub const FCREPO_CONTAINER: &str = "http://fedora.info/definitions/v4/repository#Container";
pub const FCREPO_CREATED: &str = "http://fedora.info/definitions/v4/repository#created";
pub const FCREPO_CREATED_BY: &str = "http://fedora.info/definitions/v4/repository#createdBy";
pub const FCREPO_LAST_MODIFIED: &str = "http://fedora.info/definitions/v4/repository#lastModified";
pub const FCREPO_LAST_MODIFIED_BY: &str =
    "http://fedora.info/definitions/v4/repository#lastModifiedBy";
pub const FCREPO_HAS_VERSION: &str = "http://fedora.info/definitions/v4/repository#hasVersion";
pub const FCREPO_HAS_VERSIONS: &str = "http://fedora.info/definitions/v4/repository#hasVersions";

pub const PREMIS_HAS_SIZE: &str = "http://www.loc.gov/premis/rdf/v1#hasSize";
pub const PREMIS_HAS_MESSAGE_DIGEST: &str = "http://www.loc.gov/premis/rdf/v1#hasMessageDigest";
pub const EBUCORE_HAS_MIME_TYPE: &str =
    "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#hasMimeType";

pub const FCSYSTEM_BURIED: &str = "http://fedora.info/definitions/v4/system#buried";
pub const FCSYSTEM_TOMBSTONE_PRED: &str = "http://fedora.info/definitions/v4/system#tombstone";
pub const FCSYSTEM_TOMBSTONE_TYPE: &str = "http://fedora.info/definitions/v4/system#Tombstone";
pub const FCSYSTEM_PAIRTREE: &str = "http://fedora.info/definitions/v4/system#Pairtree";

/// `true` if a client-provided triple using `predicate` must be rejected
/// (or silently dropped, per the caller's policy) because the repository
/// manages it.
pub fn is_server_managed_predicate(predicate: &str) -> bool {
    SERVER_MANAGED_PREDICATES.contains(&predicate)
}

/// `true` if `type_iri` is server-managed and not in the create-time
/// exemption list.
pub fn is_server_managed_type(type_iri: &str, on_create: bool) -> bool {
    if on_create && EXEMPT_ON_CREATE.contains(&type_iri) {
        return false;
    }
    SERVER_MANAGED_TYPES.contains(&type_iri)
}
