//! Every screen the client can show, and which of them need a session.

use chrono::NaiveDate;
use elibrary_core::auth::Guarded;
use elibrary_core::models::BookPatch;

/// Fields for a new catalog entry, as typed on the command line
#[derive(Debug, Clone)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: String,
    pub published: NaiveDate,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Route {
    SignIn {
        email: Option<String>,
        password: Option<String>,
    },
    SignUp {
        name: String,
        email: Option<String>,
        password: Option<String>,
    },
    SignOut,
    WhoAmI,
    Books,
    BookDetail(String),
    Borrow {
        book_id: String,
        return_date: String,
    },
    Return(String),
    Profile,
    UpdateProfile {
        name: Option<String>,
        email: Option<String>,
    },
    DeleteAccount {
        confirmed: bool,
    },
    AddBook(BookForm),
    EditBook {
        book_id: String,
        patch: BookPatch,
    },
    RemoveBooks(Vec<String>),
}

impl Guarded for Route {
    fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Borrow { .. }
                | Route::Return(_)
                | Route::Profile
                | Route::UpdateProfile { .. }
                | Route::DeleteAccount { .. }
        ) || self.requires_admin()
    }

    fn requires_admin(&self) -> bool {
        matches!(
            self,
            Route::AddBook(_) | Route::EditBook { .. } | Route::RemoveBooks(_)
        )
    }

    fn sign_in() -> Self {
        Route::SignIn {
            email: None,
            password: None,
        }
    }
}

impl Route {
    /// Short name for log lines and messages
    pub fn name(&self) -> &'static str {
        match self {
            Route::SignIn { .. } => "signin",
            Route::SignUp { .. } => "signup",
            Route::SignOut => "signout",
            Route::WhoAmI => "whoami",
            Route::Books => "books",
            Route::BookDetail(_) => "book detail",
            Route::Borrow { .. } => "borrow",
            Route::Return(_) => "return",
            Route::Profile => "profile",
            Route::UpdateProfile { .. } => "profile update",
            Route::DeleteAccount { .. } => "profile delete",
            Route::AddBook(_) => "books add",
            Route::EditBook { .. } => "books edit",
            Route::RemoveBooks(_) => "books remove",
        }
    }
}
