use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::capabilities::{Capabilities, DelayOutput, Ticket};
use crate::container::{StateContainer, StateError};
use crate::event::Event;
use crate::pipeline::{self, SortSelection, Sortable};
use crate::screens::booking::{self, BookingDraft, BookingStatus};
use crate::screens::check_in::{self, BoardingPass, CheckInState};
use crate::screens::documents::{DocumentKind, DocumentWallet, ExpiryStatus};
use crate::screens::itinerary::{Itinerary, ItineraryError};
use crate::screens::navigation::NavigationState;
use crate::screens::onboarding::{self, OnboardingState};
use crate::screens::preferences::TravelPreferences;
use crate::screens::profile::ProfileSetup;
use crate::screens::reviews::{self, Review, ReviewDraft, ReviewFilters};
use crate::screens::search::{self, SearchFilters, SearchQuery, SearchResult};
use crate::screens::{ScreenId, ScreenState};
use crate::validation::FieldErrors;
use crate::wizard::{StepWizard, WizardId};
use crate::{
    format_distance, format_time_ago, today, AppError, ErrorKind, ToastKind, ToastMessage, UnixTimeMs,
    BOOKING_PROCESSING_DELAY, BOOKING_STEPS, CHECK_IN_PROCESSING_DELAY, CHECK_IN_STEPS, ONBOARDING_STEPS,
};

/// Author name stamped on reviews written on this device.
const LOCAL_AUTHOR: &str = "You";

/// Binds `$form` to the container backing `$screen`, borrowed as written in
/// the brackets (`&self.forms` or `&mut self.forms`).
macro_rules! with_form {
    ($screen:expr, $form:ident in [$($forms:tt)+] => $body:expr) => {
        match $screen {
            ScreenId::Onboarding => {
                let $form = $($forms)+.onboarding;
                $body
            }
            ScreenId::Profile => {
                let $form = $($forms)+.profile;
                $body
            }
            ScreenId::Preferences => {
                let $form = $($forms)+.preferences;
                $body
            }
            ScreenId::Search => {
                let $form = $($forms)+.search;
                $body
            }
            ScreenId::Booking => {
                let $form = $($forms)+.booking;
                $body
            }
            ScreenId::Itinerary => {
                let $form = $($forms)+.itinerary;
                $body
            }
            ScreenId::CheckIn => {
                let $form = $($forms)+.check_in;
                $body
            }
            ScreenId::Navigation => {
                let $form = $($forms)+.navigation;
                $body
            }
            ScreenId::Reviews => {
                let $form = $($forms)+.reviews;
                $body
            }
            ScreenId::Documents => {
                let $form = $($forms)+.documents;
                $body
            }
        }
    };
}

fn edit_field<T: ScreenState>(form: &mut StateContainer<T>, path: &str, value: Value) -> Result<(), StateError> {
    form.update_normalized(path, value, T::normalize)
}

fn toggle_tag<T: ScreenState>(form: &mut StateContainer<T>, path: &str, tag: &str) -> Result<bool, StateError> {
    match T::selection_limit(path) {
        Some(max) => form.toggle_list_field_bounded(path, tag, max),
        None => form.toggle_list_field(path, tag),
    }
}

/// One typed state container per feature screen.
#[derive(Debug, Clone, Default)]
pub struct Forms {
    pub onboarding: StateContainer<OnboardingState>,
    pub profile: StateContainer<ProfileSetup>,
    pub preferences: StateContainer<TravelPreferences>,
    pub search: StateContainer<SearchQuery>,
    pub booking: StateContainer<BookingDraft>,
    pub itinerary: StateContainer<Itinerary>,
    pub check_in: StateContainer<CheckInState>,
    pub navigation: StateContainer<NavigationState>,
    pub reviews: StateContainer<ReviewDraft>,
    pub documents: StateContainer<DocumentWallet>,
}

impl Forms {
    fn snapshot(&self, screen: ScreenId) -> Result<Value, StateError> {
        with_form!(screen, form in [&self] => form.snapshot())
    }

    fn revision(&self, screen: ScreenId) -> u64 {
        with_form!(screen, form in [&self] => form.revision())
    }

    fn validate(&self, screen: ScreenId) -> FieldErrors {
        with_form!(screen, form in [&self] => form.state().validate())
    }

    fn edit(&mut self, screen: ScreenId, path: &str, value: Value) -> Result<(), StateError> {
        with_form!(screen, form in [&mut self] => edit_field(form, path, value))
    }

    fn toggle(&mut self, screen: ScreenId, path: &str, tag: &str) -> Result<bool, StateError> {
        with_form!(screen, form in [&mut self] => toggle_tag(form, path, tag))
    }

    fn reset(&mut self, screen: ScreenId) {
        with_form!(screen, form in [&mut self] => form.reset());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Booking,
    CheckIn,
}

impl TaskKind {
    const fn screen(self) -> ScreenId {
        match self {
            Self::Booking => ScreenId::Booking,
            Self::CheckIn => ScreenId::CheckIn,
        }
    }
}

/// The one simulated processing delay that may be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTask {
    pub ticket: Ticket,
    pub kind: TaskKind,
}

#[derive(Debug, Clone)]
pub struct Model {
    pub screen: ScreenId,
    pub forms: Forms,

    // Step wizards
    pub onboarding_wizard: StepWizard,
    pub booking_wizard: StepWizard,
    pub check_in_wizard: StepWizard,
    pub onboarding_complete: bool,

    // Search
    pub searching: bool,
    pub search_results: Vec<SearchResult>,
    pub search_filters: SearchFilters,
    pub search_sort: SortSelection,

    // Reviews
    pub reviews: Vec<Review>,
    pub review_filters: ReviewFilters,
    pub review_sort: SortSelection,
    pub helpful_marked: BTreeSet<String>,

    // Processing
    pub booking_status: BookingStatus,
    pub boarding_pass: Option<BoardingPass>,
    pub pending_task: Option<PendingTask>,
    pub last_ticket: Ticket,

    // Generic UI state
    pub field_errors: FieldErrors,
    pub active_error: Option<AppError>,
    pub active_toast: Option<ToastMessage>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            screen: ScreenId::default(),
            forms: Forms::default(),
            onboarding_wizard: StepWizard::new(ONBOARDING_STEPS),
            booking_wizard: StepWizard::new(BOOKING_STEPS),
            check_in_wizard: StepWizard::new(CHECK_IN_STEPS),
            onboarding_complete: false,
            searching: false,
            search_results: Vec::new(),
            search_filters: SearchFilters::default(),
            search_sort: search::default_sort(),
            reviews: Vec::new(),
            review_filters: ReviewFilters::default(),
            review_sort: reviews::default_sort(),
            helpful_marked: BTreeSet::new(),
            booking_status: BookingStatus::default(),
            boarding_pass: None,
            pending_task: None,
            last_ticket: Ticket(0),
            field_errors: FieldErrors::new(),
            active_error: None,
            active_toast: None,
        }
    }
}

impl Model {
    const fn wizard_id(&self) -> Option<WizardId> {
        match self.screen {
            ScreenId::Onboarding => Some(WizardId::Onboarding),
            ScreenId::Booking => Some(WizardId::Booking),
            ScreenId::CheckIn => Some(WizardId::CheckIn),
            _ => None,
        }
    }

    const fn wizard(&self, id: WizardId) -> StepWizard {
        match id {
            WizardId::Onboarding => self.onboarding_wizard,
            WizardId::Booking => self.booking_wizard,
            WizardId::CheckIn => self.check_in_wizard,
        }
    }

    fn wizard_mut(&mut self, id: WizardId) -> &mut StepWizard {
        match id {
            WizardId::Onboarding => &mut self.onboarding_wizard,
            WizardId::Booking => &mut self.booking_wizard,
            WizardId::CheckIn => &mut self.check_in_wizard,
        }
    }

    fn validate_step(&self, id: WizardId, step: u8) -> FieldErrors {
        match id {
            WizardId::Onboarding => self.forms.onboarding.state().validate_step(step),
            WizardId::Booking => self.forms.booking.state().validate_step(step),
            WizardId::CheckIn => self.forms.check_in.state().validate_step(step),
        }
    }

    /// Checks steps `from..to` in order and parks the wizard on the first
    /// one that fails. Returns false if any step failed.
    fn check_steps(&mut self, id: WizardId, from: u8, to: u8) -> bool {
        for step in from..to {
            let errors = self.validate_step(id, step);
            if !errors.is_empty() {
                // `step` comes from the wizard's own range.
                let _ = self.wizard_mut(id).go_to(step);
                self.field_errors = errors;
                return false;
            }
        }
        true
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.last_ticket = self.last_ticket.next();
        self.last_ticket
    }

    fn is_processing(&self, kind: TaskKind) -> bool {
        self.pending_task.is_some_and(|task| task.kind == kind)
    }

    /// The open screen's form is frozen while its submission is in flight.
    fn form_locked(&self) -> bool {
        self.pending_task.is_some_and(|task| task.kind.screen() == self.screen)
    }

    fn fail(&mut self, error: impl Into<AppError>) {
        let error = error.into();
        debug!(code = error.code(), %error, "surfacing error");
        self.active_error = Some(error);
    }

    fn toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind));
    }

    /// Drops everything the screen held, cancelling its processing delay.
    fn leave_screen(&mut self, screen: ScreenId, caps: &Capabilities) {
        if let Some(task) = self.pending_task.filter(|task| task.kind.screen() == screen) {
            caps.delay.cancel(task.ticket);
            self.pending_task = None;
        }

        self.forms.reset(screen);
        match screen {
            ScreenId::Onboarding => self.onboarding_wizard.restart(),
            ScreenId::Booking => {
                self.booking_wizard.restart();
                self.booking_status = BookingStatus::Draft;
            }
            ScreenId::CheckIn => {
                self.check_in_wizard.restart();
                self.boarding_pass = None;
            }
            ScreenId::Search => {
                self.searching = false;
                self.search_results.clear();
                self.search_filters = SearchFilters::default();
                self.search_sort = search::default_sort();
            }
            ScreenId::Reviews => {
                self.reviews.clear();
                self.review_filters = ReviewFilters::default();
                self.review_sort = reviews::default_sort();
                self.helpful_marked.clear();
            }
            ScreenId::Profile
            | ScreenId::Preferences
            | ScreenId::Itinerary
            | ScreenId::Navigation
            | ScreenId::Documents => {}
        }
    }

    fn open_screen(&mut self, screen: ScreenId, caps: &Capabilities) -> bool {
        if screen == self.screen {
            return false;
        }
        let previous = self.screen;
        self.leave_screen(previous, caps);
        self.screen = screen;
        self.field_errors = FieldErrors::new();
        self.active_error = None;
        debug!(from = %previous, to = %screen, "screen changed");
        true
    }
}

#[derive(Default)]
pub struct App;

impl App {
    /// Applies `event`; returns whether anything the view shows changed.
    fn handle(&self, event: Event, model: &mut Model, caps: &Capabilities) -> bool {
        match event {
            Event::ScreenOpened { screen } => model.open_screen(screen, caps),

            Event::FieldEdited { path, value } => {
                if model.form_locked() {
                    debug!(%path, "submission in flight, edit ignored");
                    return false;
                }
                match model.forms.edit(model.screen, &path, value) {
                    Ok(()) => {
                        model.field_errors.remove(&path);
                        true
                    }
                    Err(StateError::Selection(e)) => {
                        let message = AppError::from(e).user_facing_message();
                        model.toast(message, ToastKind::Warning);
                        true
                    }
                    Err(e) => {
                        warn!(screen = %model.screen, %path, error = %e, "rejected field edit");
                        false
                    }
                }
            }

            Event::TagToggled { .. } | Event::WizardAdvanced | Event::WizardBack | Event::WizardJumped { .. }
                if model.form_locked() =>
            {
                debug!(screen = %model.screen, "submission in flight, input ignored");
                false
            }

            Event::TagToggled { path, tag } => match model.forms.toggle(model.screen, &path, &tag) {
                Ok(_) => {
                    model.field_errors.remove(&path);
                    true
                }
                Err(StateError::Selection(e)) => {
                    let message = AppError::from(e).user_facing_message();
                    model.toast(message, ToastKind::Warning);
                    true
                }
                Err(e) => {
                    warn!(screen = %model.screen, %path, error = %e, "rejected tag toggle");
                    false
                }
            },

            Event::FormReset => {
                let screen = model.screen;
                model.leave_screen(screen, caps);
                model.field_errors = FieldErrors::new();
                true
            }

            Event::WizardAdvanced => {
                let Some(id) = model.wizard_id() else {
                    warn!(screen = %model.screen, "screen has no wizard");
                    return false;
                };
                let current = model.wizard(id).current();
                if !model.check_steps(id, current, current + 1) {
                    return true;
                }
                if model.wizard_mut(id).advance() {
                    model.field_errors = FieldErrors::new();
                    true
                } else {
                    debug!(?id, "already on the last step");
                    false
                }
            }

            Event::WizardBack => {
                let Some(id) = model.wizard_id() else {
                    warn!(screen = %model.screen, "screen has no wizard");
                    return false;
                };
                if model.wizard_mut(id).back() {
                    model.field_errors = FieldErrors::new();
                    true
                } else {
                    false
                }
            }

            Event::WizardJumped { step } => {
                let Some(id) = model.wizard_id() else {
                    warn!(screen = %model.screen, "screen has no wizard");
                    return false;
                };
                let wizard = model.wizard(id);
                if step > wizard.current()
                    && step <= wizard.total()
                    && !model.check_steps(id, wizard.current(), step)
                {
                    return true;
                }
                match model.wizard_mut(id).go_to(step) {
                    Ok(()) => {
                        model.field_errors = FieldErrors::new();
                        true
                    }
                    Err(e) => {
                        model.fail(e);
                        true
                    }
                }
            }

            Event::OnboardingCompleted => {
                if model.screen != ScreenId::Onboarding {
                    return false;
                }
                if !model.check_steps(WizardId::Onboarding, 1, ONBOARDING_STEPS.get() + 1) {
                    return true;
                }
                model.onboarding_complete = true;
                let name = model.forms.onboarding.state().display_name.trim().to_owned();
                model.toast(format!("Welcome aboard, {name}!"), ToastKind::Success);
                true
            }

            Event::SearchRequested => {
                if model.screen != ScreenId::Search {
                    return false;
                }
                let errors = model.forms.search.state().validate();
                if errors.is_empty() {
                    model.searching = true;
                    model.search_results.clear();
                }
                model.field_errors = errors;
                true
            }

            Event::SearchResultsLoaded { results } => {
                if model.screen != ScreenId::Search {
                    debug!(count = results.len(), "search results arrived after leaving search");
                    return false;
                }
                model.searching = false;
                model.search_results = results;
                true
            }

            Event::SearchFailed { message } => {
                if model.screen != ScreenId::Search {
                    return false;
                }
                model.searching = false;
                model.fail(AppError::new(ErrorKind::SearchFailed, "Search failed").with_internal(message));
                true
            }

            Event::SearchFiltersChanged(filters) => {
                model.search_filters = *filters;
                true
            }

            Event::SearchSortChanged(sort) => match sort.to_spec::<SearchResult>().validate() {
                Ok(()) => {
                    model.search_sort = sort;
                    true
                }
                Err(e) => {
                    warn!(error = %e, "rejected search sort");
                    false
                }
            },

            Event::ListingSelected { id } => {
                let Some(listing) = model.search_results.iter().find(|r| r.id == id).cloned() else {
                    model.fail(AppError::new(ErrorKind::NotFound, "Listing not found").with_context("id", id));
                    return true;
                };
                let query = model.forms.search.state().clone();

                model.open_screen(ScreenId::Booking, caps);
                model.forms.booking.modify(|draft| {
                    draft.listing_id = listing.id;
                    draft.listing_name = listing.name;
                    draft.nightly_rate = listing.price;
                    draft.stay.check_in = query.check_in;
                    draft.stay.check_out = query.check_out;
                    draft.stay.guests = query.guests;
                    draft.updated_at = UnixTimeMs::now();
                });
                true
            }

            Event::BookingSubmitted => {
                if model.screen != ScreenId::Booking || model.booking_status != BookingStatus::Draft {
                    debug!(status = ?model.booking_status, "booking not submittable");
                    return false;
                }
                if !model.check_steps(WizardId::Booking, 1, BOOKING_STEPS.get() + 1) {
                    return true;
                }
                let ticket = model.issue_ticket();
                model.booking_status = BookingStatus::Processing;
                model.pending_task = Some(PendingTask {
                    ticket,
                    kind: TaskKind::Booking,
                });
                model.field_errors = FieldErrors::new();
                caps.delay.start(ticket, BOOKING_PROCESSING_DELAY, move |output| {
                    Event::ProcessingFinished { ticket, output }
                });
                true
            }

            Event::BookingCancelled => Self::cancel_task(model, TaskKind::Booking, caps),

            Event::CheckInSubmitted => {
                if model.screen != ScreenId::CheckIn || model.pending_task.is_some() || model.boarding_pass.is_some() {
                    return false;
                }
                if !model.check_steps(WizardId::CheckIn, 1, CHECK_IN_STEPS.get() + 1) {
                    return true;
                }
                let ticket = model.issue_ticket();
                model.pending_task = Some(PendingTask {
                    ticket,
                    kind: TaskKind::CheckIn,
                });
                model.field_errors = FieldErrors::new();
                caps.delay.start(ticket, CHECK_IN_PROCESSING_DELAY, move |output| {
                    Event::ProcessingFinished { ticket, output }
                });
                true
            }

            Event::CheckInCancelled => Self::cancel_task(model, TaskKind::CheckIn, caps),

            Event::ProcessingFinished { ticket, output } => {
                let Some(task) = model.pending_task.filter(|task| task.ticket == ticket) else {
                    debug!(%ticket, "ignoring stale processing result");
                    return false;
                };
                model.pending_task = None;
                Self::finish_task(model, task.kind, output);
                true
            }

            Event::ItineraryDayAdded { date, title } => {
                Self::edit_itinerary(model, |plan| plan.add_day(date, title))
            }
            Event::ItineraryDayRemoved { date } => {
                Self::edit_itinerary(model, |plan| plan.remove_day(date).map(drop))
            }
            Event::ActivityAdded { date, draft } => {
                Self::edit_itinerary(model, |plan| plan.add_activity(date, *draft).map(drop))
            }
            Event::ActivityRemoved { id } => Self::edit_itinerary(model, |plan| plan.remove_activity(&id).map(drop)),
            Event::ActivityCompleted { id, completed } => {
                Self::edit_itinerary(model, |plan| plan.set_completed(&id, completed))
            }

            Event::PositionUpdated { position } => {
                if model.screen != ScreenId::Navigation {
                    return false;
                }
                let result = model.forms.navigation.try_modify(|nav| {
                    let reached = nav.advance_if_arrived(position)?;
                    Ok::<_, crate::CoordinateError>((reached, nav.has_arrived()))
                });
                match result {
                    Ok((_, true)) => model.toast("You have arrived.", ToastKind::Success),
                    Ok((Some(stop), false)) => model.toast(format!("Reached {stop}"), ToastKind::Info),
                    Ok((None, false)) => {}
                    Err(e) => model.fail(e),
                }
                true
            }

            Event::ReviewsLoaded { reviews } => {
                if model.screen != ScreenId::Reviews {
                    return false;
                }
                model.reviews = reviews;
                true
            }

            Event::ReviewFiltersChanged(filters) => {
                model.review_filters = *filters;
                true
            }

            Event::ReviewSortChanged(sort) => match sort.to_spec::<Review>().validate() {
                Ok(()) => {
                    model.review_sort = sort;
                    true
                }
                Err(e) => {
                    warn!(error = %e, "rejected review sort");
                    false
                }
            },

            Event::ReviewSubmitted => {
                if model.screen != ScreenId::Reviews {
                    return false;
                }
                let errors = model.forms.reviews.state().validate();
                if !errors.is_empty() {
                    model.field_errors = errors;
                    return true;
                }
                let review = model.forms.reviews.state().clone().into_review(LOCAL_AUTHOR, today());
                model.reviews.insert(0, review);
                model.forms.reviews.reset();
                model.field_errors = FieldErrors::new();
                model.toast("Thanks for your review!", ToastKind::Success);
                true
            }

            Event::ReviewMarkedHelpful { id } => {
                if model.helpful_marked.contains(&id) {
                    return false;
                }
                let Some(review) = model.reviews.iter_mut().find(|r| r.id == id) else {
                    model.fail(AppError::new(ErrorKind::NotFound, "Review not found").with_context("id", id));
                    return true;
                };
                review.helpful_count += 1;
                model.helpful_marked.insert(id);
                true
            }

            Event::DocumentSaved => {
                if model.screen != ScreenId::Documents {
                    return false;
                }
                let today = today();
                let saved = model.forms.documents.try_modify(|wallet| {
                    let id = wallet.save_draft_on(today)?;
                    wallet.updated_at = UnixTimeMs::now();
                    Ok::<_, FieldErrors>(id)
                });
                match saved {
                    Ok(_) => {
                        model.field_errors = FieldErrors::new();
                        model.toast("Document saved.", ToastKind::Success);
                    }
                    Err(errors) => model.field_errors = errors,
                }
                true
            }

            Event::DocumentRemoved { id } => {
                let removed = model.forms.documents.try_modify(|wallet| {
                    let doc = wallet.remove(&id).ok_or_else(|| {
                        AppError::new(ErrorKind::NotFound, "Document not found").with_context("id", &id)
                    })?;
                    wallet.updated_at = UnixTimeMs::now();
                    Ok::<_, AppError>(doc)
                });
                if let Err(e) = removed {
                    model.fail(e);
                }
                true
            }

            Event::ErrorDismissed => model.active_error.take().is_some(),
            Event::ToastDismissed => model.active_toast.take().is_some(),
        }
    }

    fn cancel_task(model: &mut Model, kind: TaskKind, caps: &Capabilities) -> bool {
        let Some(task) = model.pending_task.filter(|task| task.kind == kind) else {
            debug!(?kind, "nothing to cancel");
            return false;
        };
        caps.delay.cancel(task.ticket);
        model.pending_task = None;
        if kind == TaskKind::Booking {
            model.booking_status = BookingStatus::Draft;
        }
        model.toast("Cancelled.", ToastKind::Info);
        true
    }

    fn finish_task(model: &mut Model, kind: TaskKind, output: DelayOutput) {
        match (kind, output) {
            (TaskKind::Booking, DelayOutput::Elapsed) => {
                let confirmation_code = booking::generate_confirmation_code();
                model.toast(format!("Booking confirmed: {confirmation_code}"), ToastKind::Success);
                model.booking_status = BookingStatus::Confirmed { confirmation_code };
            }
            (TaskKind::CheckIn, DelayOutput::Elapsed) => {
                let state = model.forms.check_in.state();
                let pass = state.boarding_pass(check_in::assign_gate(&state.flight_number));
                model.toast(format!("Checked in. Gate {}", pass.gate), ToastKind::Success);
                model.boarding_pass = Some(pass);
            }
            (TaskKind::Booking, DelayOutput::Cancelled) => {
                model.booking_status = BookingStatus::Draft;
                model.toast("Cancelled.", ToastKind::Info);
            }
            (TaskKind::CheckIn, DelayOutput::Cancelled) => model.toast("Cancelled.", ToastKind::Info),
        }
    }

    fn edit_itinerary(model: &mut Model, f: impl FnOnce(&mut Itinerary) -> Result<(), ItineraryError>) -> bool {
        if model.screen != ScreenId::Itinerary {
            return false;
        }
        let result = model.forms.itinerary.try_modify(|plan| {
            f(plan)?;
            plan.updated_at = UnixTimeMs::now();
            Ok::<_, ItineraryError>(())
        });
        if let Err(e) = result {
            model.fail(e);
        }
        true
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    #[tracing::instrument(
        skip_all,
        fields(event = event.name(), user = event.is_user_initiated(), screen = %model.screen)
    )]
    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if self.handle(event, model, caps) {
            caps.render.render();
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let form = model.forms.snapshot(model.screen).unwrap_or_else(|e| {
            warn!(screen = %model.screen, error = %e, "form snapshot failed");
            Value::Null
        });

        ViewModel {
            screen: model.screen,
            form,
            revision: model.forms.revision(model.screen),
            wizard: model.wizard_id().map(|id| WizardView::new(id, model.wizard(id))),
            field_errors: model.field_errors.clone(),
            detail: ScreenView::build(model),
            can_submit: model.forms.validate(model.screen).is_empty(),
            error: model.active_error.as_ref().map(UserFacingError::from),
            toast: model
                .active_toast
                .as_ref()
                .filter(|toast| !toast.is_expired(UnixTimeMs::now()))
                .map(ToastView::from),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub screen: ScreenId,
    /// The active screen's state as the shell binds it, camelCase keys.
    pub form: Value,
    pub revision: u64,
    pub wizard: Option<WizardView>,
    pub field_errors: FieldErrors,
    pub detail: ScreenView,
    pub can_submit: bool,
    pub error: Option<UserFacingError>,
    pub toast: Option<ToastView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WizardView {
    pub id: WizardId,
    pub step: u8,
    pub total: u8,
    pub progress: f64,
    pub can_go_back: bool,
    pub is_last: bool,
}

impl WizardView {
    fn new(id: WizardId, wizard: StepWizard) -> Self {
        Self {
            id,
            step: wizard.current(),
            total: wizard.total(),
            progress: wizard.progress(),
            can_go_back: !wizard.is_first(),
            is_last: wizard.is_last(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserFacingError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for UserFacingError {
    fn from(error: &AppError) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.user_facing_message(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
    pub expires_at_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(toast: &ToastMessage) -> Self {
        Self {
            message: toast.message.clone(),
            kind: toast.kind,
            duration_ms: toast.duration_ms,
            expires_at_ms: toast.expires_at().as_millis(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: String,
    pub kind: DocumentKind,
    pub holder_name: String,
    pub masked_number: String,
    pub status: ExpiryStatus,
}

/// Derived, read-only data for the active screen.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScreenView {
    Onboarding {
        completed: bool,
        interest_options: Vec<String>,
        travel_style_options: Vec<String>,
    },
    Profile {
        full_name: String,
    },
    Preferences {
        last_updated: String,
    },
    Search {
        searching: bool,
        results: Vec<SearchResult>,
        total_results: usize,
        active_filters: usize,
        sort: SortSelection,
    },
    Booking {
        listing_name: String,
        add_on_options: Vec<String>,
        status: BookingStatus,
        nights: u32,
        total: f64,
    },
    Itinerary {
        days: usize,
        activities: usize,
        total_cost: f64,
        completion_percent: u8,
    },
    CheckIn {
        processing: bool,
        boarding_pass: Option<BoardingPass>,
    },
    Navigation {
        remaining: Option<String>,
        eta_minutes: Option<u32>,
        next_stop: Option<String>,
        arrived: bool,
    },
    Reviews {
        reviews: Vec<Review>,
        total_reviews: usize,
        average_rating: Option<f64>,
        histogram: [u32; 5],
        sort: SortSelection,
        marked_helpful: Vec<String>,
        highlight_options: Vec<String>,
    },
    Documents {
        documents: Vec<DocumentView>,
        needing_attention: usize,
    },
}

fn processed<T: Sortable + Clone>(
    records: &[T],
    filters: &pipeline::FilterSpec<T>,
    sort: &SortSelection,
) -> Vec<T> {
    pipeline::process(records, filters, &sort.to_spec()).unwrap_or_else(|e| {
        warn!(error = %e, "showing records unsorted");
        records.iter().filter(|r| filters.matches(r)).cloned().collect()
    })
}

impl ScreenView {
    fn build(model: &Model) -> Self {
        let forms = &model.forms;
        match model.screen {
            ScreenId::Onboarding => Self::Onboarding {
                completed: model.onboarding_complete,
                interest_options: onboarding::INTEREST_OPTIONS.iter().map(|&s| s.to_owned()).collect(),
                travel_style_options: onboarding::TRAVEL_STYLE_OPTIONS.iter().map(|&s| s.to_owned()).collect(),
            },
            ScreenId::Profile => Self::Profile {
                full_name: forms.profile.state().full_name(),
            },
            ScreenId::Preferences => Self::Preferences {
                last_updated: format_time_ago(
                    forms.preferences.state().last_updated.as_millis(),
                    UnixTimeMs::now().as_millis(),
                ),
            },
            ScreenId::Search => {
                let filters = model.search_filters.to_spec();
                Self::Search {
                    searching: model.searching,
                    results: processed(&model.search_results, &filters, &model.search_sort),
                    total_results: model.search_results.len(),
                    active_filters: filters.len(),
                    sort: model.search_sort.clone(),
                }
            }
            ScreenId::Booking => {
                let draft = forms.booking.state();
                Self::Booking {
                    listing_name: draft.listing_name.clone(),
                    add_on_options: booking::ADD_ON_OPTIONS.iter().map(|&s| s.to_owned()).collect(),
                    status: model.booking_status.clone(),
                    nights: draft.nights(),
                    total: draft.total(),
                }
            }
            ScreenId::Itinerary => {
                let plan = forms.itinerary.state();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let completion_percent = (plan.completion() * 100.0).round().clamp(0.0, 100.0) as u8;
                Self::Itinerary {
                    days: plan.days.len(),
                    activities: plan.activities().count(),
                    total_cost: plan.total_cost(),
                    completion_percent,
                }
            }
            ScreenId::CheckIn => Self::CheckIn {
                processing: model.is_processing(TaskKind::CheckIn),
                boarding_pass: model.boarding_pass.clone(),
            },
            ScreenId::Navigation => {
                let nav = forms.navigation.state();
                Self::Navigation {
                    remaining: nav.remaining_distance_m().ok().flatten().map(format_distance),
                    eta_minutes: nav.eta_minutes().ok().flatten(),
                    next_stop: nav
                        .waypoints
                        .first()
                        .or(nav.destination.as_ref())
                        .map(|w| w.name.clone()),
                    arrived: nav.has_arrived(),
                }
            }
            ScreenId::Reviews => Self::Reviews {
                reviews: processed(&model.reviews, &model.review_filters.to_spec(), &model.review_sort),
                total_reviews: model.reviews.len(),
                average_rating: reviews::average_rating(&model.reviews),
                histogram: reviews::histogram(&model.reviews),
                sort: model.review_sort.clone(),
                marked_helpful: model.helpful_marked.iter().cloned().collect(),
                highlight_options: reviews::HIGHLIGHT_OPTIONS.iter().map(|&s| s.to_owned()).collect(),
            },
            ScreenId::Documents => {
                let wallet = forms.documents.state();
                let today = today();
                Self::Documents {
                    documents: wallet
                        .documents
                        .iter()
                        .map(|d| DocumentView {
                            id: d.id.clone(),
                            kind: d.kind,
                            holder_name: d.holder_name.clone(),
                            masked_number: d.masked_number(),
                            status: d.expiry_status(today),
                        })
                        .collect(),
                    needing_attention: wallet.needing_attention(today).count(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{DelayOperation, Effect};
    use crux_core::testing::AppTester;
    use serde_json::json;

    fn tester() -> AppTester<App, Effect> {
        AppTester::default()
    }

    fn renders(effects: &[Effect]) -> bool {
        effects.iter().any(|e| matches!(e, Effect::Render(_)))
    }

    mod form_tests {
        use super::*;

        #[test]
        fn test_field_edit_updates_form_and_renders() {
            let app = tester();
            let mut model = Model::default();
            let update = app.update(
                Event::FieldEdited {
                    path: "displayName".into(),
                    value: json!("Ana"),
                },
                &mut model,
            );
            assert!(renders(&update.effects));
            assert_eq!(model.forms.onboarding.state().display_name, "Ana");
            assert_eq!(app.view(&model).form["displayName"], "Ana");
        }

        #[test]
        fn test_rejected_edit_leaves_model_and_skips_render() {
            let app = tester();
            let mut model = Model::default();
            let before = model.forms.onboarding.clone();
            let update = app.update(
                Event::FieldEdited {
                    path: "displayName.first".into(),
                    value: json!("Ana"),
                },
                &mut model,
            );
            assert!(!renders(&update.effects));
            assert_eq!(model.forms.onboarding, before);
            assert!(model.active_error.is_none());
        }

        #[test]
        fn test_tag_limit_shows_toast() {
            let app = tester();
            let mut model = Model::default();
            for style in ["budget", "comfort", "luxury"] {
                app.update(
                    Event::TagToggled {
                        path: "travelStyles".into(),
                        tag: style.into(),
                    },
                    &mut model,
                );
            }
            let update = app.update(
                Event::TagToggled {
                    path: "travelStyles".into(),
                    tag: "solo".into(),
                },
                &mut model,
            );
            assert!(renders(&update.effects));
            assert_eq!(model.forms.onboarding.state().travel_styles.len(), 3);
            let toast = model.active_toast.as_ref().unwrap();
            assert_eq!(toast.kind, ToastKind::Warning);
            assert_eq!(toast.message, "You can pick up to 3 options.");
        }

        #[test]
        fn test_list_write_over_limit_keeps_state_and_warns() {
            let app = tester();
            let mut model = Model::default();
            let before = model.forms.onboarding.clone();
            let mut interests: Vec<_> = crate::screens::onboarding::INTEREST_OPTIONS.to_vec();
            interests.push("food");
            assert_eq!(interests.len(), 11);

            let update = app.update(
                Event::FieldEdited {
                    path: "interests".into(),
                    value: json!(interests),
                },
                &mut model,
            );
            assert!(renders(&update.effects));
            assert_eq!(model.forms.onboarding, before);
            let toast = model.active_toast.as_ref().unwrap();
            assert_eq!(toast.kind, ToastKind::Warning);
            assert_eq!(toast.message, "You can pick up to 8 options.");
        }

        #[test]
        fn test_list_write_collapses_repeated_tags() {
            let app = tester();
            let mut model = Model::default();
            app.update(
                Event::FieldEdited {
                    path: "interests".into(),
                    value: json!(["food", "hiking", "food"]),
                },
                &mut model,
            );
            assert_eq!(model.forms.onboarding.state().interests, ["food", "hiking"]);
            assert_eq!(app.view(&model).form["interests"], json!(["food", "hiking"]));
        }

        #[test]
        fn test_days_write_is_ordered_and_rejects_repeated_dates() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::ScreenOpened { screen: ScreenId::Itinerary }, &mut model);
            let day = |date: &str, title: &str| json!({ "date": date, "title": title, "activities": [] });

            let update = app.update(
                Event::FieldEdited {
                    path: "days".into(),
                    value: json!([day("2026-11-03", "Sintra"), day("2026-11-01", "Arrival")]),
                },
                &mut model,
            );
            assert!(renders(&update.effects));
            let titles: Vec<_> = model.forms.itinerary.state().days.iter().map(|d| d.title.clone()).collect();
            assert_eq!(titles, ["Arrival", "Sintra"]);

            let before = model.forms.itinerary.clone();
            let update = app.update(
                Event::FieldEdited {
                    path: "days".into(),
                    value: json!([day("2026-11-01", "Arrival"), day("2026-11-01", "Again")]),
                },
                &mut model,
            );
            assert!(!renders(&update.effects));
            assert_eq!(model.forms.itinerary, before);
        }

        #[test]
        fn test_expired_toast_hidden_from_view() {
            let app = tester();
            let mut model = Model::default();
            model.toast("Saved", ToastKind::Success);
            let created = model.active_toast.as_ref().unwrap().created_at;
            let toast = app.view(&model).toast.unwrap();
            assert_eq!(toast.expires_at_ms, created.add_millis(toast.duration_ms).as_millis());

            model.active_toast = Some(ToastMessage {
                created_at: UnixTimeMs(0),
                ..ToastMessage::new("Old news", ToastKind::Info)
            });
            assert!(app.view(&model).toast.is_none());
        }

        #[test]
        fn test_leaving_screen_resets_its_state() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::ScreenOpened { screen: ScreenId::Preferences }, &mut model);
            app.update(
                Event::FieldEdited {
                    path: "travel.budget.currency".into(),
                    value: json!("EUR"),
                },
                &mut model,
            );
            assert_eq!(model.forms.preferences.state().travel.budget.currency, "EUR");

            app.update(Event::ScreenOpened { screen: ScreenId::Profile }, &mut model);
            assert_eq!(model.forms.preferences.state().travel.budget.currency, "USD");
        }

        #[test]
        fn test_reopening_same_screen_is_a_no_op() {
            let app = tester();
            let mut model = Model::default();
            let update = app.update(Event::ScreenOpened { screen: ScreenId::Onboarding }, &mut model);
            assert!(!renders(&update.effects));
        }
    }

    mod wizard_tests {
        use super::*;

        #[test]
        fn test_advance_blocked_by_step_errors() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::WizardAdvanced, &mut model);
            assert_eq!(model.onboarding_wizard.current(), 2);

            let update = app.update(Event::WizardAdvanced, &mut model);
            assert!(renders(&update.effects));
            assert_eq!(model.onboarding_wizard.current(), 2);
            assert!(model.field_errors.contains("displayName"));
        }

        #[test]
        fn test_jump_forward_stops_at_first_incomplete_step() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::WizardJumped { step: 4 }, &mut model);
            assert_eq!(model.onboarding_wizard.current(), 2);
            assert!(model.field_errors.contains("homeCity"));
        }

        #[test]
        fn test_jump_out_of_range_surfaces_error() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::WizardJumped { step: 0 }, &mut model);
            let view = app.view(&model);
            assert_eq!(view.error.unwrap().code, "VALIDATION_ERROR");
        }

        #[test]
        fn test_screen_without_wizard_ignores_steps() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::ScreenOpened { screen: ScreenId::Profile }, &mut model);
            let update = app.update(Event::WizardAdvanced, &mut model);
            assert!(!renders(&update.effects));
            assert!(app.view(&model).wizard.is_none());
        }
    }

    mod processing_tests {
        use super::*;

        fn ready_check_in(app: &AppTester<App, Effect>, model: &mut Model) {
            app.update(Event::ScreenOpened { screen: ScreenId::CheckIn }, model);
            for (path, value) in [
                ("bookingReference", json!("AB12CD")),
                ("lastName", json!("Silva")),
                ("flightNumber", json!("TP1234")),
                ("seat", json!("14C")),
                ("hazmatAcknowledged", json!(true)),
                ("documentsConfirmed", json!(true)),
            ] {
                app.update(
                    Event::FieldEdited {
                        path: path.into(),
                        value,
                    },
                    model,
                );
            }
        }

        #[test]
        fn test_check_in_issues_boarding_pass_after_delay() {
            let app = tester();
            let mut model = Model::default();
            ready_check_in(&app, &mut model);

            let mut update = app.update(Event::CheckInSubmitted, &mut model);
            assert_eq!(
                app.view(&model).detail,
                ScreenView::CheckIn {
                    processing: true,
                    boarding_pass: None,
                }
            );

            let mut request = update
                .effects
                .drain(..)
                .find_map(|e| match e {
                    Effect::Delay(request) => Some(request),
                    _ => None,
                })
                .unwrap();
            assert_eq!(
                request.operation,
                DelayOperation::Start {
                    ticket: Ticket(1),
                    duration_ms: 1500,
                }
            );

            let resolved = app.resolve(&mut request, DelayOutput::Elapsed).unwrap();
            for event in resolved.events {
                app.update(event, &mut model);
            }
            let pass = model.boarding_pass.as_ref().unwrap();
            assert_eq!(pass.passenger, "SILVA");
            assert!(model.pending_task.is_none());
        }

        #[test]
        fn test_stale_result_is_ignored() {
            let app = tester();
            let mut model = Model::default();
            ready_check_in(&app, &mut model);
            app.update(Event::CheckInSubmitted, &mut model);
            app.update(Event::CheckInCancelled, &mut model);

            let update = app.update(
                Event::ProcessingFinished {
                    ticket: Ticket(1),
                    output: DelayOutput::Elapsed,
                },
                &mut model,
            );
            assert!(!renders(&update.effects));
            assert!(model.boarding_pass.is_none());
        }

        #[test]
        fn test_form_frozen_while_submission_runs() {
            let app = tester();
            let mut model = Model::default();
            ready_check_in(&app, &mut model);
            app.update(Event::CheckInSubmitted, &mut model);
            let before = model.forms.check_in.clone();
            let step = model.check_in_wizard.current();

            for event in [
                Event::FieldEdited {
                    path: "seat".into(),
                    value: json!("2A"),
                },
                Event::TagToggled {
                    path: "baggage.specialItems".into(),
                    tag: "surfboard".into(),
                },
                Event::WizardAdvanced,
                Event::WizardBack,
                Event::WizardJumped { step: 1 },
            ] {
                let update = app.update(event, &mut model);
                assert!(!renders(&update.effects));
            }
            assert_eq!(model.forms.check_in, before);
            assert_eq!(model.check_in_wizard.current(), step);
            assert!(model.active_error.is_none());
        }

        #[test]
        fn test_leaving_screen_cancels_delay() {
            let app = tester();
            let mut model = Model::default();
            ready_check_in(&app, &mut model);
            app.update(Event::CheckInSubmitted, &mut model);

            let update = app.update(Event::ScreenOpened { screen: ScreenId::Search }, &mut model);
            assert!(update.effects.iter().any(|e| matches!(
                e,
                Effect::Delay(r) if r.operation == DelayOperation::Cancel { ticket: Ticket(1) }
            )));
            assert!(model.pending_task.is_none());
        }
    }

    mod list_tests {
        use super::*;
        use crate::screens::reviews::fixtures::review;
        use crate::screens::search::fixtures::result;

        #[test]
        fn test_search_view_applies_filters_and_sort() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::ScreenOpened { screen: ScreenId::Search }, &mut model);
            app.update(
                Event::SearchResultsLoaded {
                    results: vec![result("a", 120.0, 4.6), result("b", 80.0, 3.9), result("c", 95.0, 4.2)],
                },
                &mut model,
            );
            app.update(
                Event::SearchFiltersChanged(Box::new(SearchFilters {
                    min_rating: Some(4.0),
                    ..SearchFilters::default()
                })),
                &mut model,
            );
            app.update(
                Event::SearchSortChanged(SortSelection::new("price", pipeline::SortOrder::Asc)),
                &mut model,
            );

            let ScreenView::Search { results, total_results, .. } = app.view(&model).detail else {
                panic!("expected search view");
            };
            let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, ["c", "a"]);
            assert_eq!(total_results, 3);
        }

        #[test]
        fn test_unknown_sort_key_rejected() {
            let app = tester();
            let mut model = Model::default();
            let update = app.update(
                Event::ReviewSortChanged(SortSelection::new("stars", pipeline::SortOrder::Asc)),
                &mut model,
            );
            assert!(!renders(&update.effects));
            assert_eq!(model.review_sort, reviews::default_sort());
        }

        #[test]
        fn test_helpful_counts_once() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::ScreenOpened { screen: ScreenId::Reviews }, &mut model);
            app.update(
                Event::ReviewsLoaded {
                    reviews: vec![review("r1", 5, 1, 2)],
                },
                &mut model,
            );
            app.update(Event::ReviewMarkedHelpful { id: "r1".into() }, &mut model);
            let update = app.update(Event::ReviewMarkedHelpful { id: "r1".into() }, &mut model);
            assert!(!renders(&update.effects));
            assert_eq!(model.reviews[0].helpful_count, 3);
        }

        #[test]
        fn test_listing_selection_prefills_booking() {
            let app = tester();
            let mut model = Model::default();
            app.update(Event::ScreenOpened { screen: ScreenId::Search }, &mut model);
            app.update(
                Event::FieldEdited {
                    path: "guests".into(),
                    value: json!(3),
                },
                &mut model,
            );
            app.update(
                Event::SearchResultsLoaded {
                    results: vec![result("a", 120.0, 4.6)],
                },
                &mut model,
            );
            app.update(Event::ListingSelected { id: "a".into() }, &mut model);

            assert_eq!(model.screen, ScreenId::Booking);
            let draft = model.forms.booking.state();
            assert_eq!(draft.listing_id, "a");
            assert_eq!(draft.stay.guests, 3);
            assert!(model.search_results.is_empty());
        }
    }
}
