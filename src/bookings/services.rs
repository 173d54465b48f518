use rust_decimal::Decimal;
use tracing::{info, warn};

use super::dto::{AvailabilityQuery, AvailabilityResponse, CreateBookingRequest};
use super::range::{parse_date, present, DateRange};
use super::repo_types::{Booking, NewBooking};
use super::store::BookingStore;
use crate::error::{AppError, AppResult};

/// Largest total a booking row can hold (`NUMERIC(10,2)`).
pub const MAX_TOTAL_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Checks a create request in order (presence, format, range, price) and prices it against
/// the vehicle's daily rate. No state is touched.
pub async fn prepare_booking(
    store: &dyn BookingStore,
    user_id: i64,
    req: &CreateBookingRequest,
) -> AppResult<NewBooking> {
    let vehicle_id = req.vehicle_id.ok_or_else(|| AppError::missing("vehicle_id"))?;
    let start = present("start_date", req.start_date.as_deref())?;
    let end = present("end_date", req.end_date.as_deref())?;
    let claimed_total = req.total_price.ok_or_else(|| AppError::missing("total_price"))?;

    let start = parse_date("start_date", Some(start))?;
    let end = parse_date("end_date", Some(end))?;
    let range = DateRange::new(start, end)?;

    if claimed_total <= Decimal::ZERO {
        return Err(AppError::validation("total_price", "must be positive"));
    }

    let rate = store
        .daily_rate(vehicle_id)
        .await?
        .ok_or_else(|| AppError::NotFound("vehicle not found".into()))?;
    let total_price = range.total_price(rate);
    if total_price > MAX_TOTAL_PRICE {
        return Err(AppError::validation(
            "end_date",
            format!("{} day(s) is too long to book", range.days()),
        ));
    }
    if claimed_total != total_price {
        return Err(AppError::validation(
            "total_price",
            format!("expected {total_price} for {} day(s)", range.days()),
        ));
    }

    Ok(NewBooking {
        user_id,
        vehicle_id,
        range,
        total_price,
    })
}

/// Validates, prices and atomically commits a new `CONFIRMED` booking.
pub async fn create_booking(
    store: &dyn BookingStore,
    user_id: i64,
    req: &CreateBookingRequest,
) -> AppResult<Booking> {
    let new = prepare_booking(store, user_id, req).await?;
    match store.insert_if_free(new).await {
        Ok(booking) => {
            info!(
                booking_id = booking.id,
                user_id,
                vehicle_id = booking.vehicle_id,
                start = %booking.start_date,
                end = %booking.end_date,
                "booking confirmed"
            );
            Ok(booking)
        }
        Err(e) => {
            if matches!(e, AppError::Conflict(_)) {
                warn!(user_id, vehicle_id = ?req.vehicle_id, "booking rejected: dates taken");
            }
            Err(e)
        }
    }
}

/// One-way `CONFIRMED -> CANCELLED`. Re-cancelling is rejected, not ignored.
pub async fn cancel_booking(
    store: &dyn BookingStore,
    user_id: i64,
    booking_id: i64,
) -> AppResult<Booking> {
    let booking = store
        .cancel(booking_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("booking not found or already cancelled".into()))?;
    info!(booking_id, user_id, "booking cancelled");
    Ok(booking)
}

/// Read-only check of whether a range is free right now. Not a reservation.
pub async fn check_availability(
    store: &dyn BookingStore,
    vehicle_id: i64,
    query: &AvailabilityQuery,
) -> AppResult<AvailabilityResponse> {
    let start = parse_date("start_date", query.start_date.as_deref())?;
    let end = parse_date("end_date", query.end_date.as_deref())?;
    let range = DateRange::new(start, end)?;

    let rate = store
        .daily_rate(vehicle_id)
        .await?
        .ok_or_else(|| AppError::NotFound("vehicle not found".into()))?;
    let available = store.is_free(vehicle_id, range).await?;

    Ok(AvailabilityResponse {
        vehicle_id,
        start_date: range.start,
        end_date: range.end,
        available,
        days: range.days(),
        total_price: range.total_price(rate),
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use super::*;
    use crate::bookings::repo_types::BookingStatus;
    use crate::bookings::store::memory::MemoryBookingStore;

    const USER: i64 = 1;
    const OTHER_USER: i64 = 2;
    const CAR: i64 = 10;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn store() -> Arc<MemoryBookingStore> {
        let store = MemoryBookingStore::new();
        store.add_vehicle(CAR, "Toyota", "Camry", 2024, dec("50.00")).await;
        Arc::new(store)
    }

    fn request(start: &str, end: &str) -> CreateBookingRequest {
        let range = DateRange::new(
            parse_date("start_date", Some(start)).unwrap(),
            parse_date("end_date", Some(end)).unwrap(),
        )
        .unwrap();
        CreateBookingRequest {
            vehicle_id: Some(CAR),
            start_date: Some(start.into()),
            end_date: Some(end.into()),
            total_price: Some(range.total_price(dec("50.00"))),
        }
    }

    #[tokio::test]
    async fn creates_confirmed_booking_with_server_price() {
        let store = store().await;
        let booking = create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-03"))
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.total_price, dec("150.00"));
        assert_eq!(booking.user_id, USER);
        assert!(booking.id > 0);
    }

    #[tokio::test]
    async fn validation_order_reports_first_missing_field() {
        let store = store().await;
        let err = create_booking(store.as_ref(), USER, &CreateBookingRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "vehicle_id", .. }));

        let mut req = request("2024-01-01", "2024-01-03");
        req.end_date = Some(String::new());
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "end_date", .. }));

        let mut req = request("2024-01-01", "2024-01-03");
        req.total_price = None;
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "total_price", .. }));
    }

    #[tokio::test]
    async fn inverted_range_rejected_before_any_write() {
        let store = store().await;
        let mut req = request("2024-01-01", "2024-01-03");
        req.start_date = Some("2024-01-05".into());
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation { field: "end_date", ref message } if message == "invalid range"
        ));
        assert!(store.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_vehicle_is_not_found() {
        let store = store().await;
        let mut req = request("2024-01-01", "2024-01-03");
        req.vehicle_id = Some(999);
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn mismatched_client_total_rejected() {
        let store = store().await;
        let mut req = request("2024-01-01", "2024-01-03");
        req.total_price = Some(dec("100.00"));
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "total_price", .. }));
        assert!(store.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn presence_checked_before_date_format() {
        let store = store().await;
        let req = CreateBookingRequest {
            vehicle_id: Some(CAR),
            start_date: Some("01/02/2024".into()),
            end_date: Some("2024-01-03".into()),
            total_price: None,
        };
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "total_price", .. }));

        let mut req = request("2024-01-01", "2024-01-03");
        req.start_date = Some("01/02/2024".into());
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "start_date", .. }));
    }

    #[test]
    fn total_cap_matches_column_precision() {
        assert_eq!(MAX_TOTAL_PRICE, dec("99999999.99"));
    }

    #[tokio::test]
    async fn total_beyond_storable_price_is_a_validation_error() {
        let store = store().await;
        let req = request("2000-01-01", "9999-12-31");
        let err = create_booking(store.as_ref(), USER, &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "end_date", .. }));
        assert!(store.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn containment_rejected_in_both_orders() {
        let store = store().await;
        create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-10"))
            .await
            .unwrap();
        let err = create_booking(store.as_ref(), OTHER_USER, &request("2024-01-02", "2024-01-05"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let store = self::store().await;
        create_booking(store.as_ref(), USER, &request("2024-01-02", "2024-01-05"))
            .await
            .unwrap();
        let err = create_booking(store.as_ref(), OTHER_USER, &request("2024-01-01", "2024-01-10"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.bookings().await.len(), 1);
    }

    #[tokio::test]
    async fn shared_boundary_day_is_a_conflict() {
        let store = store().await;
        create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-03"))
            .await
            .unwrap();
        let err = create_booking(store.as_ref(), USER, &request("2024-01-03", "2024-01-05"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn back_to_back_ranges_are_accepted() {
        let store = store().await;
        create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-03"))
            .await
            .unwrap();
        create_booking(store.as_ref(), USER, &request("2024-01-04", "2024-01-05"))
            .await
            .unwrap();
        assert_eq!(store.bookings().await.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_booking_does_not_block() {
        let store = store().await;
        let first = create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-05"))
            .await
            .unwrap();
        cancel_booking(store.as_ref(), USER, first.id).await.unwrap();
        let second = create_booking(store.as_ref(), OTHER_USER, &request("2024-01-01", "2024-01-05"))
            .await
            .unwrap();
        assert_eq!(second.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn recancel_is_rejected() {
        let store = store().await;
        let booking = create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-02"))
            .await
            .unwrap();
        let cancelled = cancel_booking(store.as_ref(), USER, booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        let err = cancel_booking(store.as_ref(), USER, booking.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_owner_can_cancel() {
        let store = store().await;
        let booking = create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-02"))
            .await
            .unwrap();
        let err = cancel_booking(store.as_ref(), OTHER_USER, booking.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.bookings().await[0].status, BookingStatus::Confirmed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_for_same_dates_admit_exactly_one() {
        let store = store().await;
        let mut handles = Vec::new();
        for user in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                create_booking(store.as_ref(), user, &request("2024-06-01", "2024-06-07")).await
            }));
        }

        let mut ok = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 7);

        let active: Vec<_> = store
            .bookings()
            .await
            .into_iter()
            .filter(|b| b.is_active())
            .collect();
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                assert!(!a.range().overlaps(&b.range()));
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_cancels_admit_exactly_one() {
        let store = store().await;
        let booking = create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-02"))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            {
                let store = store.clone();
                tokio::spawn(async move { cancel_booking(store.as_ref(), USER, booking.id).await })
            },
            {
                let store = store.clone();
                tokio::spawn(async move { cancel_booking(store.as_ref(), USER, booking.id).await })
            }
        );
        let results = [a.unwrap(), b.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(AppError::NotFound(_))))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn availability_reflects_active_bookings() {
        let store = store().await;
        let booking = create_booking(store.as_ref(), USER, &request("2024-01-01", "2024-01-05"))
            .await
            .unwrap();
        let query = AvailabilityQuery {
            start_date: Some("2024-01-05".into()),
            end_date: Some("2024-01-06".into()),
        };
        let resp = check_availability(store.as_ref(), CAR, &query).await.unwrap();
        assert!(!resp.available);
        assert_eq!(resp.days, 2);
        assert_eq!(resp.total_price, dec("100.00"));

        cancel_booking(store.as_ref(), USER, booking.id).await.unwrap();
        let resp = check_availability(store.as_ref(), CAR, &query).await.unwrap();
        assert!(resp.available);
    }
}
