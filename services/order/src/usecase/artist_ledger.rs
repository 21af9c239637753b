use std::boxed::Box;
use std::result::Result as DefaultResult;

use crate::api::web::dto::ArtistTransactionDto;
use crate::repository::AbsArtistLedgerRepo;
use crate::AppAuthedClaim;

use super::AppUsKsError;

pub struct ListArtistTransactionsUseCase {
    pub repo: Box<dyn AbsArtistLedgerRepo>,
    pub authed_usr: AppAuthedClaim,
}

impl ListArtistTransactionsUseCase {
    pub async fn execute(self) -> DefaultResult<Vec<ArtistTransactionDto>, AppUsKsError> {
        // artists share the profile ID space with every other user
        let artist_id = if self.authed_usr.is_staff() {
            None
        } else {
            Some(self.authed_usr.profile)
        };
        let entries = self.repo.fetch_by_artist(artist_id).await?;
        Ok(entries.into_iter().map(ArtistTransactionDto::from).collect())
    }
}
