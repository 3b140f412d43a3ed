//! sqlx adapter for the persistence ports.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{types::Json, Postgres, Transaction};

use super::{BookingStore, BookingTx, CatalogStore, SeatClaim, StoreError};
use crate::database::Database;
use crate::models::{
    HistorySeat, InsertedOrder, Movie, MovieFilter, MoviePage, MovieUpdate, NewMovie, NewOrder, OrderHistory,
    SeatLabel, SeatState, ShowingSchedule,
};

pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingStore for Database {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Ограничиваем ожидание блокировок только этой транзакцией
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgBookingTx { tx }))
    }

    async fn showing_cinema(&self, showing_id: i32) -> Result<Option<i32>, StoreError> {
        let cinema = sqlx::query_scalar::<_, i32>("SELECT cinemas_id FROM now_showing WHERE id = $1")
            .bind(showing_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cinema)
    }

    async fn seat_inventory(&self, showing_id: i32, cinema_id: i32) -> Result<Vec<SeatState>, StoreError> {
        // Отсутствие строки в showing_seats означает свободное место
        let seats = sqlx::query_as::<_, SeatState>(
            r#"
            SELECT
                s.id AS seat_id,
                s.seat_row,
                s.seat_number,
                COALESCE(ss.status = 'sold', false) AS is_sold
            FROM seats s
            LEFT JOIN showing_seats ss
                ON ss.seat_id = s.id AND ss.now_showing_id = $1
            WHERE s.cinemas_id = $2
            ORDER BY s.seat_row, s.seat_number
            "#,
        )
        .bind(showing_id)
        .bind(cinema_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(seats)
    }

    async fn order_history(&self, user_id: i32) -> Result<Vec<OrderHistory>, StoreError> {
        let rows = sqlx::query_as::<_, OrderHistoryRow>(
            r#"
            SELECT
                o.id,
                o.users_id,
                o.price,
                o.payment_id,
                o.is_paid,
                o.created_at,
                o.now_showing_id,
                m.title AS movie_title,
                ns.show_date,
                ns.show_time,
                c.cinema_name,
                json_agg(
                    json_build_object('row', s.seat_row, 'seat_number', s.seat_number)
                    ORDER BY s.seat_row, s.seat_number
                ) AS seats,
                t.qr_code
            FROM orders o
            JOIN now_showing ns ON ns.id = o.now_showing_id
            JOIN movies m ON m.id = ns.movie_id
            JOIN cinemas c ON c.id = ns.cinemas_id
            JOIN orders_seats os ON os.orders_id = o.id
            JOIN seats s ON s.id = os.seat_id
            JOIN orders_ticket ot ON ot.orders_id = o.id
            JOIN ticket t ON t.id = ot.ticket_id
            WHERE o.users_id = $1
            GROUP BY o.id, m.title, ns.show_date, ns.show_time, c.cinema_name, t.qr_code
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderHistory::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct OrderHistoryRow {
    id: i32,
    users_id: i32,
    price: i64,
    payment_id: i32,
    is_paid: bool,
    created_at: DateTime<Utc>,
    now_showing_id: i32,
    movie_title: String,
    show_date: NaiveDate,
    show_time: NaiveTime,
    cinema_name: String,
    seats: Json<Vec<HistorySeat>>,
    qr_code: String,
}

impl From<OrderHistoryRow> for OrderHistory {
    fn from(row: OrderHistoryRow) -> Self {
        OrderHistory {
            id: row.id,
            users_id: row.users_id,
            price: row.price,
            payment_id: row.payment_id,
            is_paid: row.is_paid,
            created_at: row.created_at,
            now_showing_id: row.now_showing_id,
            movie_title: row.movie_title,
            show_date: row.show_date,
            show_time: row.show_time,
            cinema_name: row.cinema_name,
            seats: row.seats.0,
            qr_code: row.qr_code,
        }
    }
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn user_exists(&mut self, user_id: i32) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn showing_cinema(&mut self, showing_id: i32) -> Result<Option<i32>, StoreError> {
        let cinema = sqlx::query_scalar::<_, i32>("SELECT cinemas_id FROM now_showing WHERE id = $1")
            .bind(showing_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(cinema)
    }

    async fn payment_method_exists(&mut self, payment_id: i32) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM payment WHERE id = $1)")
            .bind(payment_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn resolve_seat(&mut self, cinema_id: i32, label: &SeatLabel) -> Result<Option<i32>, StoreError> {
        let seat_id = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM seats WHERE cinemas_id = $1 AND seat_row = $2 AND seat_number = $3",
        )
        .bind(cinema_id)
        .bind(label.row())
        .bind(label.number())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(seat_id)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<InsertedOrder, StoreError> {
        let inserted = sqlx::query_as::<_, InsertedOrder>(
            r#"
            INSERT INTO orders (users_id, price, payment_id, now_showing_id, cinemas_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, created_at
            "#,
        )
        .bind(order.user_id)
        .bind(order.price)
        .bind(order.payment_id)
        .bind(order.showing_id)
        .bind(order.cinema_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(inserted)
    }

    async fn insert_ticket(&mut self, qr_code: &str) -> Result<i32, StoreError> {
        let ticket_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO ticket (qr_code, created_at, updated_at) VALUES ($1, NOW(), NOW()) RETURNING id",
        )
        .bind(qr_code)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(ticket_id)
    }

    async fn link_order_ticket(&mut self, order_id: i32, ticket_id: i32) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO orders_ticket (orders_id, ticket_id, created_at, updated_at) VALUES ($1, $2, NOW(), NOW())",
        )
        .bind(order_id)
        .bind(ticket_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn claim_seat(&mut self, showing_id: i32, seat_id: i32, user_id: i32) -> Result<SeatClaim, StoreError> {
        // Один оператор: уникальный ключ (now_showing_id, seat_id) сериализует
        // конкурентные вставки, а WHERE не даёт перезаписать проданное место.
        let claimed = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO showing_seats (now_showing_id, seat_id, status, user_id, created_at, updated_at)
            VALUES ($1, $2, 'sold', $3, NOW(), NOW())
            ON CONFLICT (now_showing_id, seat_id) DO UPDATE
                SET status = 'sold', user_id = EXCLUDED.user_id, updated_at = NOW()
                WHERE showing_seats.status <> 'sold'
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(showing_id)
        .bind(seat_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(match claimed {
            Some(true) => SeatClaim::Inserted,
            Some(false) => SeatClaim::Transitioned,
            None => SeatClaim::AlreadySold,
        })
    }

    async fn attach_seat(&mut self, order_id: i32, seat_id: i32) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO orders_seats (orders_id, seat_id) VALUES ($1, $2)")
            .bind(order_id)
            .bind(seat_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgBookingTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for Database {
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres
            FROM movies
            WHERE deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn popular_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres
            FROM movies
            WHERE deleted_at IS NULL
            ORDER BY rating DESC NULLS LAST, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn upcoming_movies(&self, today: NaiveDate) -> Result<Vec<Movie>, StoreError> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres
            FROM movies
            WHERE deleted_at IS NULL AND release_date > $1
            ORDER BY release_date, id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn movie(&self, movie_id: i32) -> Result<Option<Movie>, StoreError> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres
            FROM movies
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn filter_movies(&self, filter: &MovieFilter) -> Result<MoviePage, StoreError> {
        let title = filter.title.as_deref().map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM movies
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR title ILIKE $1)
              AND (cardinality($2::text[]) = 0 OR genres && $2)
            "#,
        )
        .bind(&title)
        .bind(&filter.genres)
        .fetch_one(&self.pool)
        .await?;

        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres
            FROM movies
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR title ILIKE $1)
              AND (cardinality($2::text[]) = 0 OR genres && $2)
            ORDER BY release_date DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&title)
        .bind(&filter.genres)
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset()))
        .fetch_all(&self.pool)
        .await?;

        Ok(MoviePage {
            movies,
            total,
            page: filter.page,
            limit: filter.limit,
        })
    }

    async fn movie_schedule(&self, movie_id: i32) -> Result<Vec<ShowingSchedule>, StoreError> {
        let schedule = sqlx::query_as::<_, ShowingSchedule>(
            r#"
            SELECT
                ns.id,
                ns.movie_id,
                m.title AS movie_title,
                c.id AS cinema_id,
                c.cinema_name,
                l.id AS location_id,
                l.name AS location_name,
                ns.show_date,
                ns.show_time
            FROM now_showing ns
            JOIN movies m ON m.id = ns.movie_id
            JOIN cinemas c ON c.id = ns.cinemas_id
            JOIN locations l ON l.id = ns.location_id
            WHERE ns.movie_id = $1 AND m.deleted_at IS NULL
            ORDER BY ns.show_date, ns.show_time, ns.id
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedule)
    }

    async fn insert_movie(&self, movie: &NewMovie) -> Result<Movie, StoreError> {
        let created = sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres
            "#,
        )
        .bind(&movie.title)
        .bind(&movie.synopsis)
        .bind(&movie.director_name)
        .bind(movie.duration_minutes)
        .bind(movie.release_date)
        .bind(movie.rating)
        .bind(&movie.poster_image)
        .bind(&movie.genres)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_movie(&self, movie_id: i32, update: &MovieUpdate) -> Result<Option<Movie>, StoreError> {
        let updated = sqlx::query_as::<_, Movie>(
            r#"
            UPDATE movies SET
                title = COALESCE($2, title),
                synopsis = COALESCE($3, synopsis),
                director_name = COALESCE($4, director_name),
                duration_minutes = COALESCE($5, duration_minutes),
                release_date = COALESCE($6, release_date),
                rating = COALESCE($7, rating),
                poster_image = COALESCE($8, poster_image),
                genres = COALESCE($9, genres),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, title, synopsis, director_name, duration_minutes, release_date, rating, poster_image, genres
            "#,
        )
        .bind(movie_id)
        .bind(&update.title)
        .bind(&update.synopsis)
        .bind(&update.director_name)
        .bind(update.duration_minutes)
        .bind(update.release_date)
        .bind(update.rating)
        .bind(&update.poster_image)
        .bind(&update.genres)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn soft_delete_movie(&self, movie_id: i32) -> Result<bool, StoreError> {
        let deleted = sqlx::query(
            "UPDATE movies SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(movie_id)
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;
        Ok(deleted)
    }
}

// ILIKE-шаблон: спецсимволы из ввода ищутся буквально
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
