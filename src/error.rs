use thiserror::Error;

/// ページ取得・抽出のエラー（物件単位で回復される）
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTPステータス {status}: {url}")]
    Status { status: u16, url: String },

    #[error("抽出エラー: {0}")]
    Extraction(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}

/// リモートストア（Airtable）のエラー。実行全体を停止させる
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ネットワークエラー: {0}")]
    Network(#[from] reqwest::Error),

    #[error("APIエラー (status={status}): {message}")]
    Api { status: u16, message: String },

    #[error("レスポンス解析エラー: {0}")]
    Parse(String),

    #[error("バッチサイズ超過: {size} > {max}")]
    BatchTooLarge { size: usize, max: usize },
}

/// 説明文生成のエラー（テンプレートへフォールバックされる）
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("ネットワークエラー: {0}")]
    Network(String),

    #[error("APIエラー: {0}")]
    Api(String),

    #[error("レスポンス解析エラー: {0}")]
    Parse(String),
}

/// 実行全体のエラー
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error("同期エラー: {0}")]
    Store(#[from] StoreError),

    #[error("CSV出力エラー: {0}")]
    Export(#[from] std::io::Error),
}
