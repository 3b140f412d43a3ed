//! All-or-nothing order creation.
//!
//! One store transaction covers every step: reference checks, seat
//! resolution, order/ticket rows, and the per-seat claims. Any error returns
//! early and drops the transaction, which rolls back everything written so
//! far. The whole run is bounded by a timeout; an expired run is dropped the
//! same way.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{CreatedOrder, NewOrder, OrderRequest, SeatLabel};
use crate::services::ticket::TicketToken;
use crate::store::{BookingStore, BookingTx, SeatClaim};

#[derive(Clone)]
pub struct OrderTransaction {
    store: Arc<dyn BookingStore>,
    timeout: Duration,
}

/// A requested label and the catalog seat it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedSeat {
    label: SeatLabel,
    seat_id: i32,
}

impl OrderTransaction {
    pub fn new(store: Arc<dyn BookingStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn create_order(&self, request: OrderRequest) -> AppResult<CreatedOrder> {
        if request.price <= 0 {
            return Err(AppError::Validation("price must be greater than 0".to_string()));
        }
        let labels = parse_seat_labels(&request.seat_labels)?;

        let outcome = tokio::time::timeout(self.timeout, self.execute(&request, &labels)).await;
        match outcome {
            Ok(Ok(order)) => {
                info!(
                    order_id = order.id,
                    ticket_id = order.ticket_id,
                    user_id = order.users_id,
                    showing_id = request.showing_id,
                    seats = order.seats_map.len(),
                    "order created"
                );
                Ok(order)
            }
            // Внутренние сбои логирует слой ответа, здесь только контекст
            Ok(Err(AppError::Internal(detail))) => Err(AppError::Internal(format!(
                "order for user {} on showing {} failed: {}",
                request.user_id, request.showing_id, detail
            ))),
            Ok(Err(rejected)) => {
                warn!(
                    user_id = request.user_id,
                    showing_id = request.showing_id,
                    "order rejected: {}",
                    rejected
                );
                Err(rejected)
            }
            // Транзакция уже уничтожена вместе с future - откат выполнен
            Err(_) => Err(AppError::Internal(format!(
                "order for user {} on showing {} exceeded {:?} and was rolled back",
                request.user_id, request.showing_id, self.timeout
            ))),
        }
    }

    async fn execute(&self, request: &OrderRequest, labels: &[SeatLabel]) -> AppResult<CreatedOrder> {
        let mut tx = self.store.begin().await?;

        // 1. Проверка ссылок
        verify_references(tx.as_mut(), request).await?;

        // 2. Места
        let seats = resolve_seats(tx.as_mut(), request.cinema_id, labels).await?;

        // 3. Токен билета
        let token = TicketToken::generate();

        // 4. Заказ, билет и связь между ними
        let order = tx
            .insert_order(&NewOrder {
                user_id: request.user_id,
                price: request.price,
                payment_id: request.payment_id,
                showing_id: request.showing_id,
                cinema_id: request.cinema_id,
            })
            .await?;
        let ticket_id = tx.insert_ticket(token.as_str()).await?;
        tx.link_order_ticket(order.id, ticket_id).await?;

        // 5. Продажа мест
        claim_seats(tx.as_mut(), request, order.id, &seats).await?;

        // 6. Фиксация
        tx.commit().await?;

        Ok(CreatedOrder {
            id: order.id,
            users_id: request.user_id,
            price: request.price,
            qr_code: token.into_string(),
            ticket_id,
            seats_map: labels.iter().map(|l| l.to_string()).collect(),
            created_at: order.created_at,
        })
    }
}

/// Parses every label up front so malformed input never opens a transaction.
/// Naming the same seat twice is an invalid selection.
pub fn parse_seat_labels(raw: &[String]) -> AppResult<Vec<SeatLabel>> {
    if raw.is_empty() {
        return Err(AppError::Validation("seats_map must name at least one seat".to_string()));
    }
    let mut seen = HashSet::with_capacity(raw.len());
    let mut labels = Vec::with_capacity(raw.len());
    for text in raw {
        let label: SeatLabel = text
            .parse()
            .map_err(|e| AppError::InvalidSeatSelection(format!("{}", e)))?;
        if !seen.insert(label.clone()) {
            return Err(AppError::InvalidSeatSelection(format!("seat {} selected more than once", label)));
        }
        labels.push(label);
    }
    Ok(labels)
}

async fn verify_references(tx: &mut dyn BookingTx, request: &OrderRequest) -> AppResult<()> {
    if !tx.user_exists(request.user_id).await? {
        return Err(AppError::UserNotFound);
    }

    let actual_cinema = tx
        .showing_cinema(request.showing_id)
        .await?
        .ok_or(AppError::ShowingNotFound)?;
    if actual_cinema != request.cinema_id {
        return Err(AppError::CinemaMismatch {
            showing_id: request.showing_id,
            requested: request.cinema_id,
        });
    }

    if !tx.payment_method_exists(request.payment_id).await? {
        return Err(AppError::PaymentMethodNotFound);
    }
    Ok(())
}

async fn resolve_seats(tx: &mut dyn BookingTx, cinema_id: i32, labels: &[SeatLabel]) -> AppResult<Vec<ResolvedSeat>> {
    let mut seats = Vec::with_capacity(labels.len());
    for label in labels {
        let seat_id = tx
            .resolve_seat(cinema_id, label)
            .await?
            .ok_or_else(|| AppError::InvalidSeatSelection(format!("seat {} does not exist in cinema {}", label, cinema_id)))?;
        seats.push(ResolvedSeat { label: label.clone(), seat_id });
    }
    Ok(seats)
}

/// Claims seats in ascending seat-id order so two overlapping requests always
/// contend for their shared seats in the same sequence.
async fn claim_seats(
    tx: &mut dyn BookingTx,
    request: &OrderRequest,
    order_id: i32,
    seats: &[ResolvedSeat],
) -> AppResult<()> {
    let mut ordered: Vec<&ResolvedSeat> = seats.iter().collect();
    ordered.sort_by_key(|s| s.seat_id);

    for seat in ordered {
        match tx.claim_seat(request.showing_id, seat.seat_id, request.user_id).await? {
            SeatClaim::AlreadySold => {
                return Err(AppError::SeatNotAvailable(seat.label.to_string()));
            }
            SeatClaim::Inserted | SeatClaim::Transitioned => {}
        }
        tx.attach_seat(order_id, seat.seat_id).await?;
    }
    Ok(())
}
