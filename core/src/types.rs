//! Domain types for the raffle platform.
//!
//! Raffles own a fixed pool of numbered tickets. Tickets are claimed by
//! participants, settled by completed payments and drawn by the winner
//! selection engine.

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{RaffleError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaffleId(Uuid);

impl RaffleId {
    /// Creates a new random `RaffleId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RaffleId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RaffleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RaffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a payment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random `PaymentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PaymentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a winner record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinnerId(Uuid);

impl WinnerId {
    /// Creates a new random `WinnerId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `WinnerId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WinnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WinnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user known to the external identity directory.
///
/// Users are never created here; the id is only a reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// An amount of money in the currency's minor unit (cents, centavos).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub const fn checked_mul(self, quantity: u64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Raffle
// ============================================================================

/// A raffle and its fixed ticket pool size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raffle {
    /// Raffle identifier
    pub id: RaffleId,
    /// Display name
    pub name: String,
    /// Free-form description shown in notifications
    pub description: String,
    /// Price of a single ticket
    pub price: Money,
    /// ISO 4217 currency code
    pub currency: String,
    /// Number of tickets generated at creation; never changes
    pub tickets_created: u32,
    /// Tickets can be claimed from this instant
    pub init_date: DateTime<Utc>,
    /// Tickets can no longer be claimed from this instant
    pub end_date: DateTime<Utc>,
    /// False once a winner is drawn or the raffle is cancelled
    pub is_active: bool,
    /// Actor that created the raffle
    pub created_by: UserId,
    /// Actor that last changed the raffle
    pub updated_by: UserId,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for provisioning a raffle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRaffle {
    /// Display name
    pub name: String,
    /// Description, may be empty
    #[serde(default)]
    pub description: String,
    /// Price of a single ticket in minor units
    pub price: Money,
    /// Currency code; the configured default is used when absent
    #[serde(default)]
    pub currency: Option<String>,
    /// Size of the ticket pool
    pub ticket_count: u32,
    /// Start of the claim window
    pub init_date: DateTime<Utc>,
    /// End of the claim window; must lie after `init_date` and in the future
    pub end_date: DateTime<Utc>,
}

impl Raffle {
    /// Whether tickets can be claimed at `now`.
    ///
    /// The window is half-open: `init_date <= now < end_date`.
    #[must_use]
    pub fn accepts_claims_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.init_date <= now && now < self.end_date
    }
}

/// Changes to an active raffle. Absent fields keep their current value.
///
/// Price and pool size are fixed once tickets exist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RaffleUpdate {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New start of the claim window
    pub init_date: Option<DateTime<Utc>>,
    /// New end of the claim window
    pub end_date: Option<DateTime<Utc>>,
}

// ============================================================================
// Ticket
// ============================================================================

/// A numbered ticket in a raffle's pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Owning raffle
    pub raffle_id: RaffleId,
    /// Number in `1..=tickets_created`, unique within the raffle
    pub ticket_number: u32,
    /// Current holder; `None` means available
    pub owner_id: Option<UserId>,
    /// Settled by a completed payment
    pub is_paid: bool,
}

impl Ticket {
    /// Builds an unowned, unpaid ticket.
    #[must_use]
    pub fn available(raffle_id: RaffleId, ticket_number: u32) -> Self {
        Self {
            id: TicketId::new(),
            raffle_id,
            ticket_number,
            owner_id: None,
            is_paid: false,
        }
    }

    /// True when nobody holds the ticket.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Owned and paid tickets take part in the draw.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.owner_id.is_some() && self.is_paid
    }
}

// ============================================================================
// Payment
// ============================================================================

/// Payment status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Session opened, waiting for confirmation
    Pending,
    /// Confirmed by the gateway; tickets settled
    Completed,
    /// Expired or cancelled; tickets released
    Failed,
}

impl PaymentStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Completed and failed payments never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment for a snapshot of claimed tickets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment identifier
    pub id: PaymentId,
    /// Raffle the tickets belong to
    pub raffle_id: RaffleId,
    /// Tickets covered by this payment, fixed at creation
    pub tickets: Vec<TicketId>,
    /// Total charged
    pub amount: Money,
    /// ISO 4217 currency code
    pub currency: String,
    /// Lifecycle status
    pub status: PaymentStatus,
    /// Session id assigned by the payment gateway
    pub gateway_session_id: String,
    /// Creation timestamp, used for expiry
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Winner
// ============================================================================

/// The single winning ticket of a raffle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    /// Winner record identifier
    pub id: WinnerId,
    /// Raffle that was drawn
    pub raffle_id: RaffleId,
    /// Winning ticket
    pub ticket_id: TicketId,
    /// Number printed on the winning ticket
    pub ticket_number: u32,
    /// Owner of the winning ticket
    pub user_id: UserId,
    /// Actor that triggered the draw
    pub drawn_by: UserId,
    /// Draw timestamp
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Listings
// ============================================================================

/// One page of a listing. Pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// Rows per page
    pub limit: u32,
    /// Page number, starting at 1
    pub page: u32,
}

impl Page {
    /// Build a page from optional query values.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] for a zero page, or a limit of zero
    /// or above [`MAX_PAGE_SIZE`].
    pub fn new(limit: Option<u32>, page: Option<u32>) -> Result<Self> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(RaffleError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(RaffleError::Validation("page must be at least 1".to_string()));
        }
        Ok(Self { limit, page })
    }

    /// Rows to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            page: 1,
        }
    }
}

/// Raffle listing criteria. Unset fields do not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RaffleFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    /// Only active or only closed raffles
    pub is_active: Option<bool>,
    /// Raffles created by this actor
    pub created_by: Option<UserId>,
    /// Requested page, newest first
    pub page: Page,
}

impl RaffleFilter {
    /// Whether `raffle` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, raffle: &Raffle) -> bool {
        let name_matches = self
            .name
            .as_ref()
            .is_none_or(|name| raffle.name.to_lowercase().contains(&name.to_lowercase()));
        name_matches
            && self.is_active.is_none_or(|active| raffle.is_active == active)
            && self.created_by.is_none_or(|actor| raffle.created_by == actor)
    }
}

/// Payment listing criteria. Unset fields do not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    /// Payments of this raffle
    pub raffle_id: Option<RaffleId>,
    /// Payments in this status
    pub status: Option<PaymentStatus>,
    /// The payment behind this gateway session
    pub gateway_session_id: Option<String>,
    /// Requested page, newest first
    pub page: Page,
}

impl PaymentFilter {
    /// Whether `payment` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, payment: &Payment) -> bool {
        self.raffle_id.is_none_or(|id| payment.raffle_id == id)
            && self.status.is_none_or(|status| payment.status == status)
            && self
                .gateway_session_id
                .as_ref()
                .is_none_or(|session| &payment.gateway_session_id == session)
    }
}

// ============================================================================
// Identity and notifications
// ============================================================================

/// Basic identity as served by the user directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// User identifier
    pub id: UserId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Delivery address for notifications
    pub email: String,
}

impl UserInfo {
    /// First and last name joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Messages sent after a draw.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// Personal message to the winner.
    #[serde(rename_all = "camelCase")]
    WinnerNotification {
        /// Winner's full name
        user_full_name: String,
        /// Raffle name
        raffle_name: String,
        /// Raffle description
        raffle_description: String,
        /// Winning ticket number
        winning_number: u32,
        /// Creator's full name
        creator_full_name: String,
        /// Creator's contact address
        creator_email: String,
    },
    /// Broadcast to every other participant.
    #[serde(rename_all = "camelCase")]
    WinnerAnnouncement {
        /// Raffle name
        raffle_name: String,
        /// Winning ticket number
        winning_number: u32,
        /// Creator's full name
        creator_full_name: String,
        /// Creator's contact address
        creator_email: String,
    },
}

impl Notification {
    /// Template identifier understood by the dispatcher.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        match self {
            Self::WinnerNotification { .. } => "WINNER_NOTIFICATION",
            Self::WinnerAnnouncement { .. } => "WINNER_ANNOUNCEMENT",
        }
    }

    /// Email subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::WinnerNotification { raffle_name, .. } => {
                format!("You won the raffle {raffle_name}!")
            }
            Self::WinnerAnnouncement { raffle_name, .. } => {
                format!("The raffle {raffle_name} has a winner")
            }
        }
    }
}
