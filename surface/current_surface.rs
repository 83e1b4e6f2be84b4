/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Republishes which page is currently interactive.
//!
//! Pages that are mid-transition (an overview or switcher layout is on
//! screen) are never reported as current through a visibility hint. An
//! explicit page selection always wins.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentSurfaceState<P> {
    Idle,
    Active(P),
}

impl<P> CurrentSurfaceState<P> {
    pub fn page(&self) -> Option<&P> {
        match self {
            Self::Idle => None,
            Self::Active(page) => Some(page),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Browsing,
    TabSwitcher,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Delivered to subscribers whenever the current page changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceChange<P> {
    pub page: Option<P>,
    /// The change came from a layout hint rather than a selection.
    pub from_hint: bool,
}

type Subscriber<P> = Box<dyn FnMut(&SurfaceChange<P>)>;

pub struct CurrentSurfaceNotifier<P> {
    state: CurrentSurfaceState<P>,
    browsing_visible: bool,
    subscribers: BTreeMap<SubscriptionId, Subscriber<P>>,
    next_id: u64,
}

impl<P: Clone + PartialEq> CurrentSurfaceNotifier<P> {
    pub fn new() -> Self {
        Self {
            state: CurrentSurfaceState::Idle,
            browsing_visible: false,
            subscribers: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn state(&self) -> &CurrentSurfaceState<P> {
        &self.state
    }

    pub fn current_page(&self) -> Option<&P> {
        self.state.page()
    }

    pub fn is_browsing_visible(&self) -> bool {
        self.browsing_visible
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&SurfaceChange<P>) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.insert(id, Box::new(subscriber));
        id
    }

    /// Subscribes and immediately delivers the current page.
    pub fn subscribe_and_trigger(
        &mut self,
        mut subscriber: impl FnMut(&SurfaceChange<P>) + 'static,
    ) -> SubscriptionId {
        subscriber(&SurfaceChange {
            page: self.state.page().cloned(),
            from_hint: false,
        });
        self.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Gate for layout hints.
    pub fn set_browsing_visible(&mut self, visible: bool) {
        self.browsing_visible = visible;
    }

    pub fn on_page_selected(&mut self, page: P) {
        self.transition(CurrentSurfaceState::Active(page), false);
    }

    pub fn on_visibility_hint(&mut self, page: Option<P>, layout: LayoutKind) {
        match page {
            Some(page) if layout == LayoutKind::Browsing => {
                if self.browsing_visible {
                    self.transition(CurrentSurfaceState::Active(page), true);
                }
            }
            _ => self.transition(CurrentSurfaceState::Idle, true),
        }
    }

    pub fn on_last_page_closing(&mut self) {
        self.transition(CurrentSurfaceState::Idle, false);
    }

    fn transition(&mut self, next: CurrentSurfaceState<P>, from_hint: bool) {
        if self.state == next {
            return;
        }
        self.state = next;
        let change = SurfaceChange {
            page: self.state.page().cloned(),
            from_hint,
        };
        for subscriber in self.subscribers.values_mut() {
            subscriber(&change);
        }
    }
}

impl<P: Clone + PartialEq> Default for CurrentSurfaceNotifier<P> {
    fn default() -> Self {
        Self::new()
    }
}
