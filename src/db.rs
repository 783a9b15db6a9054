use sqlx::{Pool, Postgres};

mod user;
pub use user::UserExt;

mod course;
pub use course::CourseExt;

mod assignment;
pub use assignment::AssignmentExt;

mod submission;
pub use submission::SubmissionExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}
impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
