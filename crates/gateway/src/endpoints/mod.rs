//! # Gatewayエンドポイント
//!
//! - `POST /asset` — アップロード用署名付きURL発行
//! - `PUT /asset/{asset_id}` — アップロード完了通知
//! - `GET /asset/{asset_id}` — ダウンロード用署名付きURL発行

pub mod confirm_upload;
pub mod download_url;
pub mod upload_url;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use confirm_upload::handle_confirm_upload;
pub use download_url::handle_download_url;
pub use upload_url::handle_upload_url;
