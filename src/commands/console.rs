use crate::client::CkdbTransport;
use crate::error::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// 'TAB' 문자열을 필드 구분자로 바꾼다
pub fn expand_tabs(line: &str, fld_sep: char) -> String {
    line.replace("TAB", &fld_sep.to_string())
}

/// 한 줄에 요청 하나. 빈 줄은 건너뛰고 실패하면 `Failed`를 출력한다.
pub async fn run_console<R, W>(
    transport: &dyn CkdbTransport,
    input: R,
    mut output: W,
    tabs: Option<char>,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut sent = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let msg = match tabs {
            Some(sep) => expand_tabs(line, sep),
            None => line.to_string(),
        };
        sent += 1;

        let out = match transport.send_reply("stdin", &msg, 1).await {
            Ok(rep) => format!("{}\n", rep.trim_end_matches(['\n', '\r'])),
            Err(e) => {
                debug!("stdin request failed: {}", e);
                "Failed\n".to_string()
            }
        };
        output.write_all(out.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(sent)
}
