//! End-to-end change-list scenarios
//!
//! Each test encodes a change list with the reference encoder, submits its
//! ranges, commits, and asserts on the resulting document.

use std::cell::RefCell;
use std::rc::Rc;

use weft_changelist::{ChangeListEncoder, ChangeListInterpreter, EncodedChangeList};
use weft_dom::{DomTree, NodeId};

/// Build a `<main>` container under the document root with one child
/// element per tag
fn mount(doc: &mut DomTree, tags: &[&str]) -> NodeId {
    let container = doc.create_element("main");
    doc.append_child(doc.root(), container).unwrap();
    for tag in tags {
        let child = doc.create_element(tag);
        doc.append_child(container, child).unwrap();
    }
    container
}

fn commit(interp: &mut ChangeListInterpreter, doc: &mut DomTree, list: &EncodedChangeList) {
    for range in list.ranges() {
        interp
            .add_change_list_range(range.offset, range.length)
            .unwrap();
    }
    interp.apply_changes(doc, list).unwrap();
}

#[test]
fn test_create_and_attach_into_empty_container() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &[]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    let div = enc.ensure_string("div");
    enc.create_element(div);
    enc.append_child();
    commit(&mut interp, &mut doc, &enc.finish());

    let first = doc.first_child(container).unwrap();
    assert!(first.is_valid());
    assert_eq!(doc.tag_name(first).unwrap(), "div");
    assert_eq!(interp.cursor_depth().unwrap(), 0);
    assert_eq!(interp.pending_ranges().unwrap(), 0);
}

#[test]
fn test_set_text() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["p"]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    enc.push_first_child();
    enc.set_text("hi");
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    assert_eq!(
        doc.outer_html(container).unwrap(),
        "<main><p>hi</p></main>"
    );
}

#[test]
fn test_volatile_attribute_sets_attribute_and_property() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["input"]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    let name = enc.ensure_string("value");
    let value = enc.ensure_string("42");
    enc.push_first_child();
    enc.set_attribute(name, value);
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let input = doc.first_child(container).unwrap();
    assert_eq!(doc.attribute(input, "value").unwrap(), Some("42"));
    assert_eq!(doc.value(input).unwrap(), Some("42"));
}

#[test]
fn test_event_payload_update_without_reregistration() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["button"]);
    let mut interp = ChangeListInterpreter::new(container);

    let fired: Rc<RefCell<Vec<(u32, u32)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&fired);
    interp
        .init_events_trampoline(move |event, a, b| {
            assert_eq!(event.event_type, "click");
            sink.borrow_mut().push((a, b));
        })
        .unwrap();

    let mut enc = ChangeListEncoder::new();
    let click = enc.ensure_string("click");
    enc.push_first_child();
    enc.new_event_listener(click, 7, 8);
    enc.update_event_listener(click, 9, 10);
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let button = doc.first_child(container).unwrap();
    assert!(interp.dispatch_event(&doc, "click", button).unwrap());
    assert_eq!(fired.borrow().as_slice(), &[(9, 10)]);
    assert_eq!(interp.listener_registrations(button, "click").unwrap(), 1);
}

#[test]
fn test_template_clone_isolation() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &[]);
    let mut interp = ChangeListInterpreter::new(container);

    // Build <ul><li>a</li></ul>, save it as template 5, attach it.
    let mut enc = ChangeListEncoder::new();
    let ul = enc.ensure_string("ul");
    let li = enc.ensure_string("li");
    enc.create_element(ul);
    enc.create_element(li);
    enc.create_text_node("a");
    enc.append_child();
    enc.append_child();
    enc.save_template(5);
    enc.append_child();
    commit(&mut interp, &mut doc, &enc.finish());

    // Push a clone and rewrite its first child.
    let mut enc = ChangeListEncoder::new();
    enc.push_template(5);
    enc.append_child();
    enc.push_child(1);
    enc.push_first_child();
    enc.set_text("b");
    enc.pop();
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    // A fresh clone still reads "a".
    let mut enc = ChangeListEncoder::new();
    enc.push_template(5);
    enc.append_child();
    commit(&mut interp, &mut doc, &enc.finish());

    let original = doc.child(container, 0).unwrap();
    let mutated = doc.child(container, 1).unwrap();
    let fresh = doc.child(container, 2).unwrap();
    assert_eq!(doc.text_content(original).unwrap(), "a");
    assert_eq!(doc.text_content(mutated).unwrap(), "b");
    assert_eq!(doc.text_content(fresh).unwrap(), "a");

    // The stored prototype itself was never touched.
    let prototype = interp.template(5).unwrap().unwrap();
    assert_eq!(doc.text_content(prototype).unwrap(), "a");
}

#[test]
fn test_remove_self_and_next_siblings() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["a", "b", "c"]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    enc.push_first_child();
    enc.remove_self_and_next_siblings();
    commit(&mut interp, &mut doc, &enc.finish());

    assert_eq!(doc.child_count(container).unwrap(), 0);
    assert_eq!(doc.outer_html(container).unwrap(), "<main></main>");
}

#[test]
fn test_sibling_walk() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["i", "b"]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    enc.push_first_child();
    enc.set_text("1");
    enc.pop_push_next_sibling();
    enc.set_text("2");
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    assert_eq!(
        doc.outer_html(container).unwrap(),
        "<main><i>1</i><b>2</b></main>"
    );
}

#[test]
fn test_sibling_walk_past_last_child() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["p"]);
    let mut interp = ChangeListInterpreter::new(container);

    // Walking past the last sibling pushes the null sentinel, which a
    // plain pop may discard.
    let mut enc = ChangeListEncoder::new();
    enc.push_first_child();
    enc.pop_push_next_sibling();
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());
    assert_eq!(interp.cursor_depth().unwrap(), 0);
}

#[test]
fn test_indexed_navigation() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["x", "y", "z"]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    enc.push_child(1);
    enc.set_text("mid");
    enc.pop_push_reverse_child(0);
    enc.set_text("last");
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    assert_eq!(
        doc.outer_html(container).unwrap(),
        "<main><x></x><y>mid</y><z>last</z></main>"
    );
}

#[test]
fn test_insert_before_with_temporaries() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["x", "z"]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    let em = enc.ensure_string("em");
    enc.save_children_to_temporaries(0, 0, 2);
    enc.push_temporary(1);
    enc.create_element(em);
    enc.insert_before();
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let tags: Vec<&str> = (0..doc.child_count(container).unwrap())
        .map(|i| doc.tag_name(doc.child(container, i).unwrap()).unwrap())
        .collect();
    assert_eq!(tags, ["x", "em", "z"]);
}

#[test]
fn test_replace_with_frees_old_annotations() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["span"]);
    let mut interp = ChangeListInterpreter::new(container);
    interp.init_events_trampoline(|_, _, _| {}).unwrap();

    let mut enc = ChangeListEncoder::new();
    let click = enc.ensure_string("click");
    enc.push_first_child();
    enc.new_event_listener(click, 1, 2);
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let span = doc.first_child(container).unwrap();
    assert_eq!(interp.listener_payloads(span, "click").unwrap(), Some((1, 2)));

    let mut enc = ChangeListEncoder::new();
    let div = enc.ensure_string("div");
    enc.push_first_child();
    enc.create_element(div);
    enc.replace_with();
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let replacement = doc.first_child(container).unwrap();
    assert_eq!(doc.tag_name(replacement).unwrap(), "div");
    assert_eq!(interp.listener_payloads(span, "click").unwrap(), None);
    assert!(!interp.dispatch_event(&doc, "click", replacement).unwrap());
}

#[test]
fn test_remove_child_frees_annotations() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["span"]);
    let mut interp = ChangeListInterpreter::new(container);
    interp.init_events_trampoline(|_, _, _| {}).unwrap();

    let mut enc = ChangeListEncoder::new();
    let input = enc.ensure_string("input");
    enc.push_first_child();
    enc.new_event_listener(input, 3, 4);
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let span = doc.first_child(container).unwrap();
    assert_eq!(interp.listener_payloads(span, "input").unwrap(), Some((3, 4)));

    let mut enc = ChangeListEncoder::new();
    enc.remove_child(0);
    commit(&mut interp, &mut doc, &enc.finish());

    assert_eq!(doc.first_child(container).unwrap(), NodeId::NONE);
    assert_eq!(interp.listener_payloads(span, "input").unwrap(), None);
}

#[test]
fn test_namespaced_element_and_attribute() {
    const SVG_NS: &str = "http://www.w3.org/2000/svg";

    let mut doc = DomTree::new();
    let container = mount(&mut doc, &[]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    let svg = enc.ensure_string("svg");
    let ns = enc.ensure_string(SVG_NS);
    let width = enc.ensure_string("width");
    let ten = enc.ensure_string("10");
    enc.create_element_ns(svg, ns);
    enc.append_child();
    enc.push_first_child();
    enc.set_attribute_ns(width, ten);
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let el = doc.first_child(container).unwrap();
    assert_eq!(doc.tag_name(el).unwrap(), "svg");
    assert_eq!(doc.namespace(el).unwrap(), Some(SVG_NS));
    assert_eq!(doc.attribute(el, "width").unwrap(), Some("10"));
}

#[test]
fn test_set_class_and_remove_attribute() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["input"]);
    let mut interp = ChangeListInterpreter::new(container);

    let mut enc = ChangeListEncoder::new();
    let checked = enc.ensure_string("checked");
    let yes = enc.ensure_string("true");
    let fancy = enc.ensure_string("fancy");
    enc.push_first_child();
    enc.set_attribute(checked, yes);
    enc.set_class(fancy);
    enc.remove_attribute(checked);
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());

    let input = doc.first_child(container).unwrap();
    assert_eq!(doc.attribute(input, "checked").unwrap(), None);
    assert!(!doc.is_checked(input).unwrap());
    assert_eq!(doc.attribute(input, "class").unwrap(), Some("fancy"));
}

#[test]
fn test_cached_strings_persist_across_frames() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &[]);
    let mut interp = ChangeListInterpreter::new(container);

    // Frame 1 only interns "div"; ensure_string allocates id 0.
    let mut enc = ChangeListEncoder::new();
    let div = enc.ensure_string("div");
    commit(&mut interp, &mut doc, &enc.finish());
    assert_eq!(interp.cached_string(div).unwrap(), Some("div"));

    // Frame 2 uses the id without re-interning.
    let mut enc = ChangeListEncoder::new();
    enc.create_element(div);
    enc.append_child();
    commit(&mut interp, &mut doc, &enc.finish());

    let first = doc.first_child(container).unwrap();
    assert_eq!(doc.tag_name(first).unwrap(), "div");

    // Same result as doing everything inline in one frame.
    let mut other_doc = DomTree::new();
    let other_container = mount(&mut other_doc, &[]);
    let mut other = ChangeListInterpreter::new(other_container);
    let mut enc = ChangeListEncoder::new();
    let tag = enc.ensure_string("div");
    enc.create_element(tag);
    enc.append_child();
    commit(&mut other, &mut other_doc, &enc.finish());

    assert_eq!(
        doc.outer_html(container).unwrap(),
        other_doc.outer_html(other_container).unwrap()
    );
}

#[test]
fn test_ranges_execute_in_submission_order() {
    let mut doc = DomTree::new();
    let container = mount(&mut doc, &["p"]);
    let mut interp = ChangeListInterpreter::new(container);

    // The cursor carries over between ranges of one commit.
    let mut enc = ChangeListEncoder::new();
    enc.push_first_child();
    enc.set_text("a");
    enc.split_range();
    enc.set_text("b");
    enc.pop();
    let list = enc.finish();
    assert_eq!(list.ranges().len(), 2);
    commit(&mut interp, &mut doc, &list);

    let p = doc.first_child(container).unwrap();
    assert_eq!(doc.text_content(p).unwrap(), "b");
}
