//! Stage graphs of the interactive flows.
//!
//! Setup: ValidatingUrl -> SelectingCreate -> SelectingDisplay -> Complete
//! Creation: AwaitingTextForm -> AwaitingChoiceForm -> BuildingRecord -> Publishable -> Published
//! Editing: SelectProperty -> SelectValue | FreeTextInput -> ApplyUpdate -> ContinueOrFinish
//! Browse: Browsing <-> Editing | Deleting -> Closed
//! Every waiting stage may end in the flow's expiry stage.

use crate::session::FlowStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    ValidatingUrl,
    SelectingCreate,
    SelectingDisplay,
    Complete,
    Cancelled,
}

impl FlowStage for SetupStage {
    fn allows(self, next: Self) -> bool {
        use SetupStage::*;
        matches!(
            (self, next),
            (ValidatingUrl, SelectingCreate)
                | (ValidatingUrl, Cancelled)
                | (SelectingCreate, SelectingDisplay)
                | (SelectingCreate, Cancelled)
                | (SelectingDisplay, Complete)
                | (SelectingDisplay, Cancelled)
        )
    }

    fn expired() -> Self {
        SetupStage::Cancelled
    }

    fn is_terminal(self) -> bool {
        matches!(self, SetupStage::Complete | SetupStage::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationStage {
    AwaitingTextForm,
    AwaitingChoiceForm,
    BuildingRecord,
    /// Record created; the owner may still publish it.
    Publishable,
    Published,
    Failed,
    Cancelled,
}

impl FlowStage for CreationStage {
    fn allows(self, next: Self) -> bool {
        use CreationStage::*;
        matches!(
            (self, next),
            (AwaitingTextForm, AwaitingChoiceForm)
                | (AwaitingTextForm, BuildingRecord)
                | (AwaitingTextForm, Cancelled)
                | (AwaitingChoiceForm, BuildingRecord)
                | (AwaitingChoiceForm, Cancelled)
                | (BuildingRecord, Publishable)
                | (BuildingRecord, Failed)
                | (Publishable, Published)
                | (Publishable, Cancelled)
        )
    }

    fn expired() -> Self {
        CreationStage::Cancelled
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            CreationStage::Published | CreationStage::Failed | CreationStage::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStage {
    SelectProperty,
    SelectValue,
    FreeTextInput,
    ApplyUpdate,
    ContinueOrFinish,
    Complete,
}

impl FlowStage for EditStage {
    fn allows(self, next: Self) -> bool {
        use EditStage::*;
        matches!(
            (self, next),
            (SelectProperty, SelectValue)
                | (SelectProperty, FreeTextInput)
                | (SelectProperty, Complete)
                | (SelectValue, ApplyUpdate)
                | (SelectValue, SelectProperty)
                | (SelectValue, Complete)
                | (FreeTextInput, ApplyUpdate)
                | (FreeTextInput, SelectProperty)
                | (FreeTextInput, Complete)
                | (ApplyUpdate, ContinueOrFinish)
                | (ContinueOrFinish, SelectProperty)
                | (ContinueOrFinish, Complete)
        )
    }

    fn expired() -> Self {
        EditStage::Complete
    }

    fn is_terminal(self) -> bool {
        self == EditStage::Complete
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseStage {
    Browsing,
    Editing,
    Deleting,
    Closed,
}

impl FlowStage for BrowseStage {
    fn allows(self, next: Self) -> bool {
        use BrowseStage::*;
        matches!(
            (self, next),
            (Browsing, Browsing)
                | (Browsing, Editing)
                | (Browsing, Deleting)
                | (Browsing, Closed)
                | (Editing, Browsing)
                | (Deleting, Browsing)
                | (Deleting, Closed)
        )
    }

    fn expired() -> Self {
        BrowseStage::Closed
    }

    fn is_terminal(self) -> bool {
        self == BrowseStage::Closed
    }
}

/// A yes/no confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmStage {
    Pending,
    Confirmed,
    Declined,
}

impl FlowStage for ConfirmStage {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (ConfirmStage::Pending, ConfirmStage::Confirmed)
                | (ConfirmStage::Pending, ConfirmStage::Declined)
        )
    }

    fn expired() -> Self {
        ConfirmStage::Declined
    }

    fn is_terminal(self) -> bool {
        self != ConfirmStage::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementStage {
    Menu,
    Choosing,
    Done,
    Cancelled,
}

impl FlowStage for ManagementStage {
    fn allows(self, next: Self) -> bool {
        use ManagementStage::*;
        matches!(
            (self, next),
            (Menu, Choosing) | (Menu, Done) | (Menu, Cancelled) | (Choosing, Done) | (Choosing, Cancelled)
        )
    }

    fn expired() -> Self {
        ManagementStage::Cancelled
    }

    fn is_terminal(self) -> bool {
        matches!(self, ManagementStage::Done | ManagementStage::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    PickProperty,
    PickOption,
    EnterTerm,
    Querying,
    Done,
    Cancelled,
}

impl FlowStage for SearchStage {
    fn allows(self, next: Self) -> bool {
        use SearchStage::*;
        matches!(
            (self, next),
            (PickProperty, PickOption)
                | (PickProperty, EnterTerm)
                | (PickProperty, Cancelled)
                | (PickOption, Querying)
                | (PickOption, Cancelled)
                | (EnterTerm, Querying)
                | (EnterTerm, Cancelled)
                | (Querying, Done)
        )
    }

    fn expired() -> Self {
        SearchStage::Cancelled
    }

    fn is_terminal(self) -> bool {
        matches!(self, SearchStage::Done | SearchStage::Cancelled)
    }
}
