use super::*;
use crate::dict::Term;

#[test]
fn rewrite_replaces_empty_and_fragment_refs() {
    let out = rewrite_relative_refs(
        "DELETE {<> <urn:p:title> \"A\"} INSERT {<> <urn:p:title> \"B\" ; <#h> <urn:p:title> \"hash\"} WHERE {}",
        "urn:fcres:x",
    );
    assert!(out.contains("<urn:fcres:x>"));
    assert!(out.contains("<urn:fcres:x#h>"));
    assert!(!out.contains("<>"));
    assert!(!out.contains("<#h>"));
}

#[test]
fn rewrite_leaves_absolute_iris_untouched() {
    let out = rewrite_relative_refs("SELECT * WHERE { ?s <urn:p:1> <urn:o:1> }", "urn:fcres:x");
    assert!(out.contains("<urn:p:1>"));
    assert!(out.contains("<urn:o:1>"));
}

#[test]
fn delta_replaces_title_and_adds_hash_fragment_triple() {
    let pre = vec![ImrTriple {
        subject: Term::iri("urn:fcres:x").unwrap(),
        predicate: Term::iri("http://purl.org/dc/terms/title").unwrap(),
        object: Term::Literal(oxrdf::Literal::new_simple_literal("A")),
    }];

    let update = "DELETE {<> <http://purl.org/dc/terms/title> \"A\"} \
                  INSERT {<> <http://purl.org/dc/terms/title> \"B\" ; \
                  <#h> <http://purl.org/dc/terms/title> \"hash\"} WHERE {}";

    let (remove, add) = sparql_delta("urn:fcres:x", &pre, update).unwrap();

    assert_eq!(remove.len(), 1);
    assert!(remove
        .iter()
        .any(|t| matches!(&t.object, Term::Literal(l) if l.value() == "A")));

    assert_eq!(add.len(), 2);
    assert!(add
        .iter()
        .any(|t| matches!(&t.object, Term::Literal(l) if l.value() == "B")));
    assert!(add.iter().any(|t| matches!(&t.subject, Term::NamedNode(n) if n.as_str() == "urn:fcres:x#h")));
}

#[test]
fn delta_is_empty_for_a_no_op_update() {
    let pre = vec![ImrTriple {
        subject: Term::iri("urn:fcres:x").unwrap(),
        predicate: Term::iri("http://purl.org/dc/terms/title").unwrap(),
        object: Term::Literal(oxrdf::Literal::new_simple_literal("A")),
    }];
    let (remove, add) = sparql_delta("urn:fcres:x", &pre, "INSERT {} WHERE {}").unwrap();
    assert!(remove.is_empty());
    assert!(add.is_empty());
}
