/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use super::current_surface::{CurrentSurfaceNotifier, SubscriptionId, SurfaceChange};

/// Per-page hook a dependent installs on whichever page is current.
pub trait PageAttachment<P> {
    fn attach(&mut self, page: &P);
    fn detach(&mut self, page: &P);
}

/// Keeps a [`PageAttachment`] on the current page, moving it as the current
/// page changes.
pub struct CurrentPageFollower<P, A> {
    attached: Option<P>,
    attachment: A,
}

impl<P: Clone + PartialEq, A: PageAttachment<P>> CurrentPageFollower<P, A> {
    pub fn new(attachment: A) -> Self {
        Self {
            attached: None,
            attachment,
        }
    }

    /// Subscribes to `notifier` and attaches to its current page right away.
    pub fn follow(
        notifier: &mut CurrentSurfaceNotifier<P>,
        attachment: A,
    ) -> (SubscriptionId, Rc<RefCell<Self>>)
    where
        P: 'static,
        A: 'static,
    {
        let follower = Rc::new(RefCell::new(Self::new(attachment)));
        let handle = Rc::clone(&follower);
        let id = notifier.subscribe_and_trigger(move |change| {
            handle.borrow_mut().on_change(change);
        });
        (id, follower)
    }

    pub fn attached_page(&self) -> Option<&P> {
        self.attached.as_ref()
    }

    pub fn attachment(&self) -> &A {
        &self.attachment
    }

    pub fn on_change(&mut self, change: &SurfaceChange<P>) {
        if self.attached == change.page {
            return;
        }
        if let Some(old) = self.attached.take() {
            self.attachment.detach(&old);
        }
        if let Some(new) = change.page.as_ref() {
            self.attachment.attach(new);
        }
        self.attached = change.page.clone();
    }

    /// Detaches from the current page, if any.
    pub fn release(&mut self) {
        if let Some(old) = self.attached.take() {
            self.attachment.detach(&old);
        }
    }
}
