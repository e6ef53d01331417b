pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>BiliMate</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 0; background: #f4f5f7; color: #222; }
  header { background: #fb7299; color: #fff; padding: 12px 20px; display: flex; justify-content: space-between; }
  main { display: grid; grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); gap: 16px; padding: 16px; }
  section { background: #fff; border-radius: 8px; padding: 12px 16px; }
  h2 { font-size: 16px; margin: 4px 0 12px; }
  .ok { color: #2e9d49; } .bad { color: #d93025; }
  table { width: 100%; border-collapse: collapse; font-size: 14px; }
  td { padding: 2px 4px; }
  pre { max-height: 360px; overflow: auto; font-size: 12px; background: #1e1e1e; color: #ddd; padding: 8px; }
  textarea { width: 100%; height: 80px; font-family: monospace; }
  #gate { display: none; padding: 40px; text-align: center; }
</style>
</head>
<body>
<header><strong>BiliMate</strong><span id="service">-</span></header>
<div id="gate">
  <p>请输入面板口令</p>
  <input id="gate-token" type="password">
  <button onclick="unlock()">进入</button>
  <p id="gate-hint" class="bad"></p>
</div>
<main id="app">
  <section>
    <h2>账号</h2>
    <div id="account"></div>
    <img id="qrcode" alt="" style="display:none">
  </section>
  <section>
    <h2>数据</h2>
    <table id="stats"></table>
  </section>
  <section>
    <h2>粉丝</h2>
    <table id="fans"></table>
  </section>
  <section>
    <h2>设置</h2>
    <label><input id="login-remember" type="checkbox" onchange="saveRemember()"> 记住登录</label>
    <textarea id="settings"></textarea>
    <button onclick="saveSettings()">保存</button>
    <button onclick="resetSettings()">恢复默认</button>
  </section>
  <section style="grid-column: 1 / -1">
    <h2>日志</h2>
    <pre id="logs"></pre>
  </section>
</main>
<script>
let token = localStorage.getItem('bilimate_token') || '';

async function authorized(path, options = {}) {
  options.headers = Object.assign({ 'Content-Type': 'application/json' }, options.headers || {});
  if (token) options.headers['Authorization'] = 'Bearer ' + token;
  const resp = await fetch(path, options);
  if (resp.status === 401) {
    document.getElementById('gate').style.display = 'block';
    document.getElementById('app').style.display = 'none';
    throw new Error('unauthorized');
  }
  return resp;
}

async function api(path, options = {}) {
  return (await authorized(path, options)).json();
}

function row(...cells) {
  const tr = document.createElement('tr');
  for (const cell of cells) {
    const td = document.createElement('td');
    td.append(cell);
    tr.append(td);
  }
  return tr;
}

let shownLoginUrl = '';

// 二维码同样需要口令，取回后以 blob 地址显示
async function showQrcode(qrcode, loginUrl) {
  if (loginUrl === shownLoginUrl) return;
  const resp = await authorized('/api/login/qrcode');
  if (!resp.ok) return;
  if (qrcode.src.startsWith('blob:')) URL.revokeObjectURL(qrcode.src);
  qrcode.src = URL.createObjectURL(await resp.blob());
  qrcode.style.display = 'block';
  shownLoginUrl = loginUrl;
}

async function unlock() {
  const input = document.getElementById('gate-token').value;
  const resp = await fetch('/api/unlock', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ token: input }),
  });
  const body = await resp.json();
  if (!resp.ok) {
    document.getElementById('gate-hint').textContent = body.error;
    return;
  }
  token = body.data.token || '';
  localStorage.setItem('bilimate_token', token);
  document.getElementById('gate').style.display = 'none';
  document.getElementById('app').style.display = 'grid';
  loadSettings();
}

const labels = {
  total_fans: '粉丝总数', inc_fans: '新增粉丝', total_click: '播放总数', inc_click: '新增播放',
  total_like: '点赞总数', inc_like: '新增点赞', total_fav: '收藏总数', inc_fav: '新增收藏',
};

async function refresh() {
  const status = (await api('/api/status')).data;
  const service = document.getElementById('service');
  service.textContent = status.service_ok ? '服务正常' : '服务异常';
  service.className = status.service_ok ? 'ok' : 'bad';

  const account = document.getElementById('account');
  const qrcode = document.getElementById('qrcode');
  if (status.login_status === 'logged_in') {
    account.textContent = status.my_uname + ' (' + status.my_mid + ')  自动回复：' +
      (status.reply_info_status ? '运行中' : '已暂停') + '  数据更新：' + (status.state_info_status ? '运行中' : '已暂停');
    qrcode.style.display = 'none';
  } else {
    account.textContent = '等待扫码登录，剩余 ' + status.login_time_cnt + ' 秒';
    if (status.login_url) await showQrcode(qrcode, status.login_url);
  }

  document.getElementById('stats').replaceChildren(
    ...Object.keys(labels).map(k => row(labels[k], String(status[k] ?? 0))));

  const fans = (await api('/api/fans')).data;
  document.getElementById('fans').replaceChildren(...fans.fans.map(f => {
    const link = document.createElement('a');
    link.target = '_blank';
    link.rel = 'noopener';
    if (f.space_url.startsWith('https://space.bilibili.com/')) link.href = f.space_url;
    link.textContent = f.uname;
    return row(link);
  }));

  document.getElementById('logs').textContent = (await api('/api/logs')).data.join('\n');
}

async function loadSettings() {
  const settings = (await api('/api/settings')).data;
  document.getElementById('settings').value = JSON.stringify(settings, null, 2);
  document.getElementById('login-remember').checked = settings.login_remember;
}

async function saveSettings() {
  const body = document.getElementById('settings').value;
  const saved = (await api('/api/settings', { method: 'PUT', body })).data;
  document.getElementById('settings').value = JSON.stringify(saved, null, 2);
}

async function resetSettings() {
  await api('/api/settings/reset', { method: 'POST' });
  loadSettings();
}

async function saveRemember() {
  const login_remember = document.getElementById('login-remember').checked;
  await api('/api/settings/login-remember', { method: 'PUT', body: JSON.stringify({ login_remember }) });
}

loadSettings().catch(() => {});
setInterval(() => refresh().catch(() => {}), 1000);
</script>
</body>
</html>
"#;
