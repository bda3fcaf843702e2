//! Example: a counter driven by change lists
//!
//! Plays the role of the wasm guest: encodes an initial render and an
//! update frame, commits both, and simulates a click.

use weft_changelist::{ChangeListEncoder, ChangeListInterpreter, EncodedChangeList};
use weft_dom::DomTree;

fn commit(
    interp: &mut ChangeListInterpreter,
    doc: &mut DomTree,
    list: &EncodedChangeList,
) {
    for range in list.ranges() {
        interp
            .add_change_list_range(range.offset, range.length)
            .unwrap();
    }
    interp.apply_changes(doc, list).unwrap();
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut doc = DomTree::new();
    let container = doc.create_element("main");
    doc.append_child(doc.root(), container).unwrap();

    let mut interp = ChangeListInterpreter::new(container);
    interp
        .init_events_trampoline(|event, a, b| {
            println!("guest trampoline: {} -> ({a}, {b})", event.event_type);
        })
        .unwrap();

    // Frame 1: <div><p>Count: 0</p><button>+1</button></div>
    let mut enc = ChangeListEncoder::new();
    let div = enc.ensure_string("div");
    let p = enc.ensure_string("p");
    let button = enc.ensure_string("button");
    let click = enc.ensure_string("click");
    enc.create_element(div);
    enc.create_element(p);
    enc.set_text("Count: 0");
    enc.append_child();
    enc.create_element(button);
    enc.set_text("+1");
    enc.new_event_listener(click, 1, 0);
    enc.append_child();
    enc.append_child();
    commit(&mut interp, &mut doc, &enc.finish());
    println!("after frame 1: {}", doc.outer_html(container).unwrap());

    // A click reaches the guest with the listener's payload pair.
    let root_div = doc.first_child(container).unwrap();
    let btn = doc.child(root_div, 1).unwrap();
    interp.dispatch_event(&doc, "click", btn).unwrap();

    // Frame 2: only the text changes.
    let mut enc = ChangeListEncoder::new();
    enc.push_first_child();
    enc.push_first_child();
    enc.set_text("Count: 1");
    enc.pop();
    enc.pop();
    commit(&mut interp, &mut doc, &enc.finish());
    println!("after frame 2: {}", doc.outer_html(container).unwrap());

    interp.unmount().unwrap();
}
