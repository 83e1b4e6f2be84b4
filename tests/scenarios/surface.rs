/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use activation_router::surface::{
    CurrentPageFollower, CurrentSurfaceNotifier, CurrentSurfaceState, LayoutKind, PageAttachment,
};

type PageId = u32;

#[derive(Default)]
struct FindBar {
    log: Vec<String>,
}

impl PageAttachment<PageId> for FindBar {
    fn attach(&mut self, page: &PageId) {
        self.log.push(format!("attach {page}"));
    }

    fn detach(&mut self, page: &PageId) {
        self.log.push(format!("detach {page}"));
    }
}

fn notifier() -> CurrentSurfaceNotifier<PageId> {
    let mut notifier = CurrentSurfaceNotifier::new();
    notifier.set_browsing_visible(true);
    notifier
}

#[test]
fn switcher_hint_never_makes_a_page_current() {
    let mut notifier = notifier();
    notifier.on_visibility_hint(Some(4), LayoutKind::TabSwitcher);
    assert_eq!(notifier.state(), &CurrentSurfaceState::Idle);

    notifier.on_page_selected(4);
    assert_eq!(notifier.current_page(), Some(&4));

    notifier.on_visibility_hint(Some(5), LayoutKind::Other);
    assert_eq!(notifier.state(), &CurrentSurfaceState::Idle);

    notifier.on_visibility_hint(Some(5), LayoutKind::Browsing);
    assert_eq!(notifier.current_page(), Some(&5));
}

#[test]
fn hints_are_ignored_while_browsing_is_hidden() {
    let mut notifier = notifier();
    notifier.on_page_selected(1);
    notifier.set_browsing_visible(false);
    notifier.on_visibility_hint(Some(2), LayoutKind::Browsing);
    assert_eq!(notifier.current_page(), Some(&1));
}

#[test]
fn follower_moves_with_the_current_page() {
    let mut notifier = notifier();
    notifier.on_page_selected(1);
    let (id, follower) = CurrentPageFollower::follow(&mut notifier, FindBar::default());
    assert_eq!(follower.borrow().attached_page(), Some(&1));

    notifier.on_page_selected(2);
    notifier.on_page_selected(2);
    notifier.on_visibility_hint(None, LayoutKind::TabSwitcher);
    notifier.on_page_selected(3);
    assert_eq!(
        follower.borrow().attachment().log,
        vec!["attach 1", "detach 1", "attach 2", "detach 2", "attach 3"]
    );

    assert!(notifier.unsubscribe(id));
    notifier.on_last_page_closing();
    assert_eq!(follower.borrow().attached_page(), Some(&3));
    follower.borrow_mut().release();
    assert_eq!(follower.borrow().attached_page(), None);
    assert_eq!(follower.borrow().attachment().log.last().map(String::as_str), Some("detach 3"));
}

#[test]
fn subscribers_see_hint_origin() {
    let mut notifier = notifier();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    notifier.subscribe(move |change| sink.borrow_mut().push((change.page, change.from_hint)));

    notifier.on_page_selected(7);
    notifier.on_visibility_hint(Some(8), LayoutKind::Browsing);
    notifier.on_last_page_closing();
    assert_eq!(
        *seen.borrow(),
        vec![(Some(7), false), (Some(8), true), (None, false)]
    );
    assert_eq!(notifier.subscriber_count(), 1);
}
